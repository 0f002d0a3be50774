pub mod contour;
pub mod moments;

pub use contour::Contour;
pub use moments::HuMoments;
