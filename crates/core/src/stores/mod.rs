pub mod azure_blob;
pub mod azure_search;
pub mod azure_vision;

pub use azure_blob::AzureBlobStore;
pub use azure_search::AzureSearchIndex;
pub use azure_vision::AzureVisionEmbedder;
