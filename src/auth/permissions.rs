/*!
 * # Permissions Module
 *
 * Permission strings are `resource:action`. A `resource:*` grant implies
 * every action on that resource, and `*` implies everything.
 */

/// Permission actions
pub struct Actions;

impl Actions {
    pub const READ: &'static str = "read";
    pub const UPDATE: &'static str = "update";
    pub const DELETE: &'static str = "delete";
    pub const MANAGE: &'static str = "manage";
    pub const ALL: &'static str = "*";
}

/// Resource types
pub struct Resources;

impl Resources {
    pub const ORDERS: &'static str = "orders";
    pub const CUSTOMERS: &'static str = "customers";
    pub const CATALOG: &'static str = "catalog";
}

/// Role that bypasses permission checks
pub const ADMIN_ROLE: &str = "admin";

pub fn format_permission(resource: &str, action: &str) -> String {
    format!("{}:{}", resource, action)
}

/// Permission string constants used by the admin routes
pub mod consts {
    pub const ORDERS_READ: &str = "orders:read";
    pub const ORDERS_UPDATE: &str = "orders:update";
    pub const ORDERS_DELETE: &str = "orders:delete";

    pub const CUSTOMERS_READ: &str = "customers:read";
    pub const CUSTOMERS_MANAGE: &str = "customers:manage";

    pub const CATALOG_MANAGE: &str = "catalog:manage";
}

/// Whether holding `granted` satisfies `required`
pub fn is_permission_implied(granted: &str, required: &str) -> bool {
    if granted == required || granted == Actions::ALL {
        return true;
    }

    match (granted.split_once(':'), required.split_once(':')) {
        (Some((granted_resource, granted_action)), Some((required_resource, _))) => {
            granted_action == Actions::ALL && granted_resource == required_resource
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_and_wildcard_grants() {
        assert!(is_permission_implied(consts::ORDERS_READ, consts::ORDERS_READ));
        assert!(is_permission_implied(
            &format_permission(Resources::ORDERS, Actions::ALL),
            consts::ORDERS_DELETE
        ));
        assert!(is_permission_implied("*", consts::CATALOG_MANAGE));
    }

    #[test]
    fn grants_do_not_leak_across_resources_or_actions() {
        assert!(!is_permission_implied(consts::ORDERS_READ, consts::ORDERS_UPDATE));
        assert!(!is_permission_implied(
            &format_permission(Resources::CUSTOMERS, Actions::ALL),
            consts::ORDERS_READ
        ));
        assert!(!is_permission_implied("orders", consts::ORDERS_READ));
    }
}
