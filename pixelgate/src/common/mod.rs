mod request;
mod target;

pub use request::RequestContext;
pub use target::TargetUrl;
