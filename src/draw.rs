pub mod glyphs;
pub mod lines;
