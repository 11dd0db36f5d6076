use sqlx::{Postgres, QueryBuilder};

use crate::models::UsageScope;

/// Append the WHERE clause shared by every usage aggregate.
///
/// Expects `usage_logs` to be aliased as `ul` in the query being built.
pub(super) fn push_scope(qb: &mut QueryBuilder<'_, Postgres>, scope: &UsageScope) {
    qb.push(" WHERE ul.deleted_at IS NULL");

    if let Some(org_id) = scope.organization_id {
        qb.push(" AND ul.user_id IN (SELECT id FROM users WHERE organization_id = ")
            .push_bind(org_id)
            .push(")");
    }
    if let Some(from) = scope.created_from {
        qb.push(" AND ul.created_at >= ").push_bind(from);
    }
    if let Some(until) = scope.created_until {
        qb.push(" AND ul.created_at ")
            .push(until.operator())
            .push(" ")
            .push_bind(until.instant());
    }
}
