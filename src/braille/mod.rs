mod canvas;
mod raster;
mod surface;

pub use canvas::BrailleCanvas;
pub use raster::{draw_circle, draw_line, draw_marker, draw_thick_line};
pub use surface::{BrailleSurface, Label};
