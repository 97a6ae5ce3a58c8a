pub mod kernels;
pub mod local_linear;
pub mod ols;
