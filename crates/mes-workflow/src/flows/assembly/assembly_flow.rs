// assembly_flow.rs
//
// Workplans de ejemplo del proceso de montaje. El montaje bifurca en dos
// subconjuntos paralelos, los une, pasa la inspección como subworkflow y
// termina en embalaje. Cualquier fallo desvía la pieza a desecho.
use crate::errors::WorkflowError;
use crate::flows::assembly::steps::{AssemblyParameters, AssemblyStep, InspectionStep, PackagingStep};
use crate::process_type::ProcessType;
use crate::step::ProductionStep;
use flow::transition::SubworkflowParameters;
use flow::{kinds, ElementId, NodeClassification, OutputDescription, Step, Workplan};

/// Nombres de los conectores de salida del workplan de inspección.
pub const INSPECTION_OK: &str = "ok";
pub const INSPECTION_SCRAP: &str = "scrap";

/// Workplan de inspección: un único paso con dos salidas de tipo `EXIT`
/// para poder anidarlo como subworkflow.
pub fn inspection_workplan() -> Result<Workplan, WorkflowError> {
  let mut wp = Workplan::new(ProcessType::Inspection.to_string());
  let start = wp.add_connector("start", NodeClassification::START)?;
  let ok = wp.add_connector(INSPECTION_OK, NodeClassification::END | NodeClassification::EXIT)?;
  let scrap = wp.add_connector(INSPECTION_SCRAP, NodeClassification::FAILED | NodeClassification::EXIT)?;
  let inspect = InspectionStep::step("inspect", &Default::default())?.input(start)
                                                                      .output(ok)
                                                                      .output(scrap);
  wp.add_step(inspect)?;
  Ok(wp)
}

/// Workplan completo de montaje.
///
/// ```text
/// start -> kitting(split) -> mount-frame  \
///                         -> mount-motor  -> marry(join) -> quality(sub) -> pack -> end
/// fallos de montaje o inspección -> scrapped
/// ```
pub fn assembly_workplan() -> Result<Workplan, WorkflowError> {
  let inner = inspection_workplan()?;
  let ok = connector_id(&inner, INSPECTION_OK)?;
  let scrap = connector_id(&inner, INSPECTION_SCRAP)?;

  let mut wp = Workplan::new(ProcessType::Assembly.to_string());
  let start = wp.add_connector("start", NodeClassification::START)?;
  let frame_in = wp.add_connector("frame-kit", NodeClassification::INTERMEDIATE)?;
  let motor_in = wp.add_connector("motor-kit", NodeClassification::INTERMEDIATE)?;
  let frame_done = wp.add_connector("frame-mounted", NodeClassification::INTERMEDIATE)?;
  let motor_done = wp.add_connector("motor-mounted", NodeClassification::INTERMEDIATE)?;
  let assembled = wp.add_connector("assembled", NodeClassification::INTERMEDIATE)?;
  let passed = wp.add_connector("passed", NodeClassification::INTERMEDIATE)?;
  let end = wp.add_connector("end", NodeClassification::END)?;
  let scrapped = wp.add_connector("scrapped", NodeClassification::FAILED)?;

  wp.add_step(Step::new(kinds::SPLIT, "kitting").input(start)
                                                 .output(frame_in)
                                                 .output(motor_in))?;
  let frame = AssemblyParameters { station: "estacion-bastidor".into(),
                                   torque_nm: 25.0 };
  wp.add_step(AssemblyStep::step("mount-frame", &frame)?.input(frame_in)
                                                        .output(frame_done)
                                                        .output(scrapped))?;
  let motor = AssemblyParameters { station: "estacion-motor".into(),
                                   torque_nm: 8.5 };
  wp.add_step(AssemblyStep::step("mount-motor", &motor)?.input(motor_in)
                                                        .output(motor_done)
                                                        .output(scrapped))?;
  wp.add_step(Step::new(kinds::JOIN, "marry").input(frame_done)
                                             .input(motor_done)
                                             .output(assembled))?;
  let params = serde_json::to_value(SubworkflowParameters { workplan: inner })?;
  wp.add_step(Step::new(kinds::SUBWORKFLOW, "quality").input(assembled)
                                                      .output(passed)
                                                      .output(scrapped)
                                                      .describe(OutputDescription::success("passed").mapped_to(ok))
                                                      .describe(OutputDescription::failure("rejected").mapped_to(scrap))
                                                      .with_parameters(params))?;
  wp.add_step(PackagingStep::step("pack", &Default::default())?.input(passed).output(end))?;
  Ok(wp)
}

/// Id del conector con ese nombre.
pub fn connector_id(workplan: &Workplan, name: &str) -> Result<ElementId, WorkflowError> {
  workplan.connectors()
          .iter()
          .find(|c| c.name == name)
          .map(|c| c.id)
          .ok_or_else(|| WorkflowError::Validation(format!("el workplan {} no tiene el conector '{}'",
                                                           workplan.name(),
                                                           name)))
}
