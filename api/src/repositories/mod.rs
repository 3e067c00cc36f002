pub mod bootcamps;
pub mod chat;
pub mod dashboard;
pub mod grades;
pub mod instructors;
pub mod reports;
pub mod scope;

pub use bootcamps::BootcampRepository;
pub use chat::ChatRepository;
pub use dashboard::DashboardRepository;
pub use grades::GradeRepository;
pub use instructors::InstructorRepository;
pub use reports::ReportRepository;
pub use scope::{BootcampScope, ScopeRepository};

use sqlx::{Postgres, QueryBuilder};

/// Appends `AND <column> = ANY($n)` when the scope is narrowed to specific bootcamps.
pub(crate) fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, column: &str, scope: &BootcampScope) {
    if let Some(ids) = scope.ids() {
        qb.push(format!(" AND {} = ANY(", column));
        qb.push_bind(ids.to_vec());
        qb.push(")");
    }
}
