//! Role-based access for the API surfaces.
//!
//! Each endpoint group declares the `Access` it needs. The decision is made
//! against a `Principal` resolved from the database on every request:
//! 1. Superuser → ALLOW (every group)
//! 2. Admin group → DENY for everyone else
//! 3. Staff group → ALLOW when the linked employee holds the group's role
//! 4. Default → DENY

use rusqlite::Connection;

use crate::db::{self, DatabaseError};
use crate::models::Role;

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

/// What an endpoint group requires of the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Admin,
    Staff(Role),
}

/// The employee profile behind an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaffIdentity {
    pub employee_id: i64,
    pub role: Role,
}

/// Authenticated caller, attached to each protected request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub account_id: i64,
    pub username: String,
    pub is_superuser: bool,
    pub staff: Option<StaffIdentity>,
}

/// Why access was granted or denied, for the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessReason {
    Superuser,
    RoleMatch,
    Denied,
}

impl Principal {
    pub fn role(&self) -> Option<Role> {
        self.staff.map(|s| s.role)
    }

    /// Employee id when the caller has a doctor profile.
    pub fn doctor_id(&self) -> Option<i64> {
        match self.staff {
            Some(StaffIdentity { employee_id, role: Role::Doctor }) => Some(employee_id),
            _ => None,
        }
    }

    pub fn check(&self, access: Access) -> AccessReason {
        if self.is_superuser {
            return AccessReason::Superuser;
        }
        match access {
            Access::Admin => AccessReason::Denied,
            Access::Staff(required) => match self.role() {
                Some(role) if role == required => AccessReason::RoleMatch,
                _ => AccessReason::Denied,
            },
        }
    }

    pub fn permits(&self, access: Access) -> bool {
        self.check(access) != AccessReason::Denied
    }
}

// ═══════════════════════════════════════════════════════════
// Resolution
// ═══════════════════════════════════════════════════════════

/// Load the caller for `account_id`.
///
/// `None` when the account no longer exists or has been deactivated, so a
/// token outliving its account stops working immediately.
pub fn resolve_principal(
    conn: &Connection,
    account_id: i64,
) -> Result<Option<Principal>, DatabaseError> {
    let Some(account) = db::get_account(conn, account_id)? else {
        return Ok(None);
    };
    if !account.is_active {
        return Ok(None);
    }
    let staff = db::get_employee_by_account(conn, account_id)?.map(|e| StaffIdentity {
        employee_id: e.id,
        role: e.role,
    });
    Ok(Some(Principal {
        account_id: account.id,
        username: account.username,
        is_superuser: account.is_superuser,
        staff,
    }))
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::make_doctor;
    use crate::db::open_memory_database;

    fn principal(is_superuser: bool, role: Option<Role>) -> Principal {
        Principal {
            account_id: 1,
            username: "user".into(),
            is_superuser,
            staff: role.map(|role| StaffIdentity { employee_id: 7, role }),
        }
    }

    #[test]
    fn superuser_passes_every_gate() {
        let admin = principal(true, None);
        assert_eq!(admin.check(Access::Admin), AccessReason::Superuser);
        for role in Role::ALL {
            assert!(admin.permits(Access::Staff(*role)));
        }
        assert_eq!(admin.doctor_id(), None);
    }

    #[test]
    fn staff_only_pass_their_own_group() {
        let pharmacist = principal(false, Some(Role::Pharmacist));
        assert_eq!(pharmacist.check(Access::Staff(Role::Pharmacist)), AccessReason::RoleMatch);
        assert!(!pharmacist.permits(Access::Staff(Role::Doctor)));
        assert!(!pharmacist.permits(Access::Admin));
    }

    #[test]
    fn account_without_profile_is_denied_staff_groups() {
        let bare = principal(false, None);
        for role in Role::ALL {
            assert_eq!(bare.check(Access::Staff(*role)), AccessReason::Denied);
        }
    }

    #[test]
    fn doctor_id_only_for_doctors() {
        assert_eq!(principal(false, Some(Role::Doctor)).doctor_id(), Some(7));
        assert_eq!(principal(false, Some(Role::LabTechnician)).doctor_id(), None);
    }

    #[test]
    fn resolve_links_staff_profile() {
        let conn = open_memory_database().unwrap();
        let doctor = make_doctor(&conn, "Ann", "Lee");
        let account = db::insert_account(&conn, "doc_1_alee", "hash", false).unwrap();
        db::link_account(&conn, doctor.id, account.id).unwrap();

        let p = resolve_principal(&conn, account.id).unwrap().unwrap();
        assert_eq!(p.username, "doc_1_alee");
        assert_eq!(p.doctor_id(), Some(doctor.id));
        assert!(resolve_principal(&conn, account.id + 100).unwrap().is_none());
    }

    #[test]
    fn inactive_account_resolves_to_none() {
        let conn = open_memory_database().unwrap();
        let account = db::insert_account(&conn, "gone", "hash", false).unwrap();
        conn.execute("UPDATE accounts SET is_active = 0 WHERE id = ?1", [account.id])
            .unwrap();
        assert!(resolve_principal(&conn, account.id).unwrap().is_none());
    }
}
