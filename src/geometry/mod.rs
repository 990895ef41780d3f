mod extended_triangle;
pub use self::extended_triangle::*;

mod line_segment;
pub use self::line_segment::*;

mod mesh;
pub use self::mesh::*;

mod oriented_box;
pub use self::oriented_box::*;

mod ray;
pub use self::ray::{Ray, Side};
pub(crate) use self::ray::TreeRay;

mod triangle;
pub use self::triangle::*;
