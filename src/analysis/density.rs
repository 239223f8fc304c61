//! Test density of a project.

use crate::project::Project;

/// Implemented test types per thousand source lines.
///
/// Returns `None` when the project has no counted source lines.
pub fn calculate(project: &Project) -> Option<f32> {
    if project.loc == 0 {
        return None;
    }
    Some(project.test_count as f32 * 1000.0 / project.loc as f32)
}
