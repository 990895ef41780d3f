mod bounding_box;
pub use self::bounding_box::*;

mod bounding_sphere;
pub use self::bounding_sphere::*;

mod containment_type;
pub use self::containment_type::*;

mod math_helper;
pub use self::math_helper::*;

mod separating_axis_bounds;
pub use self::separating_axis_bounds::*;
