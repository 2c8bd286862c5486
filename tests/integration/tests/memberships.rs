//! Membership tests.

use idm_ldap::OpKind;
use idm_model::Role;
use idm_store::{IdentityStore, MembershipQuery, Range, StoreError};

use crate::common::{TestEnv, GROUPS_DN, ROLES_DN, USERS_DN};

/// Creating a membership links the user into the role and the role into
/// the group; removing it undoes both.
#[tokio::test]
async fn test_membership_round_trip() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let role = env.store.create_role("developer").await?;
    let user = env.store.create_user("John Doe").await?;
    let group = env.store.create_group("engineering", None).await?;

    let membership = env.store.create_membership(&role, &user, &group).await?;
    assert!(membership.is_linked());
    assert_eq!(
        env.members(&format!("cn=developer,{ROLES_DN}"))?,
        vec![format!("uid=JDoe,{USERS_DN}")]
    );
    assert_eq!(
        env.members(&format!("cn=engineering,{GROUPS_DN}"))?,
        vec![format!("cn=developer,{ROLES_DN}")]
    );

    env.store.remove_membership(&role, &user, &group).await?;

    let role = env
        .store
        .get_role("developer")
        .await?
        .ok_or_else(|| anyhow::anyhow!("role missing"))?;
    let group = env
        .store
        .get_group("engineering")
        .await?
        .ok_or_else(|| anyhow::anyhow!("group missing"))?;
    assert!(!role.has_member("JDoe"));
    assert!(!group.has_role("developer"));

    Ok(())
}

/// The placeholder member is replaced by the first real member and comes
/// back when the last one leaves.
#[tokio::test]
async fn test_role_placeholder_member() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let role = env.store.create_role("developer").await?;
    let user = env.store.create_user("John Doe").await?;
    let group = env.store.create_group("engineering", None).await?;
    let role_dn = format!("cn=developer,{ROLES_DN}");

    assert_eq!(env.members(&role_dn)?, vec![" "]);

    env.store.create_membership(&role, &user, &group).await?;
    assert_eq!(env.members(&role_dn)?, vec![format!("uid=JDoe,{USERS_DN}")]);

    env.store.remove_membership(&role, &user, &group).await?;
    assert_eq!(env.members(&role_dn)?, vec![" "]);

    Ok(())
}

/// Repeating a membership merges into the existing one without writing.
#[tokio::test]
async fn test_duplicate_membership_is_merged() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let role = env.store.create_role("developer").await?;
    let user = env.store.create_user("John Doe").await?;
    let group = env.store.create_group("engineering", None).await?;
    env.store.create_membership(&role, &user, &group).await?;
    env.directory.clear_operations();

    let again = env.store.create_membership(&role, &user, &group).await?;

    assert!(again.is_linked());
    assert_eq!(env.rebinds(), 0);
    assert_eq!(env.members(&format!("cn=developer,{ROLES_DN}"))?.len(), 1);

    Ok(())
}

/// Removing a membership that was never created changes nothing.
#[tokio::test]
async fn test_remove_absent_membership() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let role = env.store.create_role("developer").await?;
    let user = env.store.create_user("John Doe").await?;
    let group = env.store.create_group("engineering", None).await?;
    env.directory.clear_operations();

    env.store.remove_membership(&role, &user, &group).await?;

    assert_eq!(env.rebinds(), 0);

    Ok(())
}

/// Memberships over entities that do not exist are rejected.
#[tokio::test]
async fn test_membership_requires_entities() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let user = env.store.create_user("John Doe").await?;
    let group = env.store.create_group("engineering", None).await?;

    let err = env
        .store
        .create_membership(&Role::new("ghost"), &user, &group)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::NotFoundByName { entity_type: "Role", .. }));

    let err = env
        .store
        .remove_membership(&Role::new("ghost"), &user, &group)
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    Ok(())
}

/// Membership lookup is reported as unsupported, never as a match or absence.
#[tokio::test]
async fn test_get_membership_unsupported() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let role = env.store.create_role("developer").await?;
    let user = env.store.create_user("John Doe").await?;
    let group = env.store.create_group("engineering", None).await?;
    env.store.create_membership(&role, &user, &group).await?;

    let err = env
        .store
        .get_membership(&role, &user, &group)
        .await
        .unwrap_err();
    assert!(err.is_unsupported());

    let err = env
        .store
        .query_memberships(
            &MembershipQuery {
                role: Some("developer".to_string()),
                ..MembershipQuery::new()
            },
            Range::all(),
        )
        .await
        .unwrap_err();
    assert!(err.is_unsupported());

    Ok(())
}

/// A failure writing the group side leaves the role side written.
#[tokio::test]
async fn test_membership_is_not_transactional() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let role = env.store.create_role("developer").await?;
    let user = env.store.create_user("John Doe").await?;
    let group = env.store.create_group("engineering", None).await?;

    // The role write-back is the first rebind, the group's the second.
    env.directory.fail_nth(OpKind::Rebind, 1, 53);

    let err = env
        .store
        .create_membership(&role, &user, &group)
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Protocol(_)), "{err}");
    assert_eq!(
        env.members(&format!("cn=developer,{ROLES_DN}"))?,
        vec![format!("uid=JDoe,{USERS_DN}")]
    );
    assert!(env.members(&format!("cn=engineering,{GROUPS_DN}"))?.is_empty());

    Ok(())
}

/// Removing a role unlinks it from the groups that held it.
#[tokio::test]
async fn test_remove_role_unlinks_groups() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let role = env.store.create_role("developer").await?;
    let user = env.store.create_user("John Doe").await?;
    let group = env.store.create_group("engineering", None).await?;
    env.store.create_membership(&role, &user, &group).await?;

    env.store.remove_role(&role).await?;

    assert!(env.store.get_role("developer").await?.is_none());
    let group = env
        .store
        .get_group("engineering")
        .await?
        .ok_or_else(|| anyhow::anyhow!("group missing"))?;
    assert!(group.roles.is_empty());

    Ok(())
}
