pub mod error;
pub mod requests;
pub mod responses;


pub use error::{Result, RpcError};
pub use requests::{CallRequest, RpcArgs, CLIENT_VERSION};
pub use responses::{CallResponse, TYPE_BUSI_EXCEPTION, TYPE_SUCCESS};
