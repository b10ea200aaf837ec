pub mod assembly_step;
pub mod inspection_step;
pub mod packaging_step;

pub use assembly_step::{AssemblyParameters, AssemblyStep};
pub use inspection_step::{InspectionParameters, InspectionStep};
pub use packaging_step::{PackagingParameters, PackagingStep};
