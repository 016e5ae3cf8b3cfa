pub mod bezier;
pub mod bounds;
pub mod finger;
pub mod proximity;
pub mod square;

pub use bezier::CubicBezier;
pub use bounds::Aabb;
pub use finger::{Finger, Lobe, PointRole};
pub use proximity::curves_within;
pub use square::WorkingSquare;
