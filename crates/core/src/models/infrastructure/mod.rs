pub mod download_url;
pub mod hash_verifier;
pub mod http_asset_provisioner;
pub mod model_registry;
