pub mod gradient;
pub mod hsl;
pub mod interior;
pub mod mapper;
pub mod palette;

pub use gradient::{ColorStop, Gradient};
pub use hsl::{hsl_to_rgb, HslSettings};
pub use interior::InteriorFill;
pub use mapper::PaletteMapper;
pub use palette::{find_palette, Palette, PaletteMode};
