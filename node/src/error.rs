use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("config error: {0}")]
    Config(String),

    #[error("secret error: {0}")]
    Secret(String),

    #[error("lmdb error: {0}")]
    Lmdb(#[from] guestpass_store_lmdb::LmdbError),

    #[error("HTTP server error: {0}")]
    Rpc(#[from] guestpass_rpc::RpcError),

    #[error("logging error: {0}")]
    Logging(String),
}
