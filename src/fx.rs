pub mod convolve;
pub mod post;
pub mod warp;
