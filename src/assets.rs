//! Loading external image assets used as captcha backgrounds.

pub mod decode;
