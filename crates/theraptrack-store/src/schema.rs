//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Plan catalog, keyed by `plan_id`.
    pub const PLANS: &str = "plans";

    /// Organizations with their subscription, keyed by `organization_id`.
    pub const ORGANIZATIONS: &str = "organizations";

    /// Partners with their subscription, keyed by `partner_id`.
    pub const PARTNERS: &str = "partners";

    /// Index: partners by organization, keyed by `organization_id || partner_id`.
    /// Value is empty (index only).
    pub const PARTNERS_BY_ORGANIZATION: &str = "partners_by_organization";

    /// Payment transactions, keyed by gateway `order_id`.
    pub const PAYMENTS: &str = "payments";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::PLANS,
        cf::ORGANIZATIONS,
        cf::PARTNERS,
        cf::PARTNERS_BY_ORGANIZATION,
        cf::PAYMENTS,
    ]
}
