pub mod cache;
pub mod detector;
pub mod error;
pub mod normalize;
pub mod quota;
pub mod vendor;
