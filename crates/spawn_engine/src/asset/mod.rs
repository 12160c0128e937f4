mod info;
mod library;

pub use info::AssetInfo;
pub use library::{AssetLibrary, AssetLibraryError, AssetLoadSummary};
