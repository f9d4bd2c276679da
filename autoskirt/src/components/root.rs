/// Component to represent that this is the root entity of an imported avatar
/// Automatically added by `asset_importer`
#[derive(Debug, Clone, Copy, Default)]
pub struct Root {}
