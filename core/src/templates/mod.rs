pub mod isotropic;
pub mod point_source;
pub mod registry;
pub mod template;

pub use isotropic::{isotropic_cube, IsotropicCube, SpectrumPoint, SpectrumTable};
pub use point_source::{scale_point_source_cube, POINT_SOURCE_NORMALIZATION};
pub use registry::{TemplateRegistry, ISOTROPIC_TEMPLATE_NAME};
pub use template::{SourceClass, Template, TemplateParams, TemplateSummary};
