//! Attribute accessor and write-back tests.

use idm_ldap::{EntityState, OpKind};
use idm_model::{AttributeHolder, Group, Role};
use idm_store::{IdentityStore, StoreError};

use crate::common::{TestEnv, GROUPS_DN, ROLES_DN, USERS_DN};

fn values(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

/// Attributes set through the store are written to the entry and read back.
#[tokio::test]
async fn test_user_attributes_round_trip() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut user = env.store.create_user("John Doe").await?;

    env.store
        .set_user_attribute(&mut user, "telephoneNumber", values(&["555-0100", "555-0101"]))
        .await?;

    assert_eq!(user.first_attribute("telephoneNumber"), Some("555-0100"));
    let stored = env.entry(&format!("uid=JDoe,{USERS_DN}"))?;
    assert_eq!(stored.get("telephoneNumber").map(<[String]>::len), Some(2));

    let fetched = env
        .store
        .get_user("John Doe")
        .await?
        .ok_or_else(|| anyhow::anyhow!("user missing"))?;
    assert_eq!(
        env.store
            .get_user_attribute_values(&fetched, "telephoneNumber")
            .await?,
        Some(values(&["555-0100", "555-0101"]))
    );
    assert_eq!(env.store.get_user_attributes(&fetched).await?.len(), 1);

    Ok(())
}

/// Setting an empty value list is the same as removing the attribute.
#[tokio::test]
async fn test_set_empty_values_removes() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut role = env.store.create_role("admin").await?;
    env.store
        .set_role_attribute(&mut role, "description", values(&["Administrators"]))
        .await?;

    env.store
        .set_role_attribute(&mut role, "description", Vec::new())
        .await?;

    assert_eq!(
        env.store.get_role_attribute_values(&role, "description").await?,
        None
    );
    assert!(!env
        .entry(&format!("cn=admin,{ROLES_DN}"))?
        .has_attr("description"));

    Ok(())
}

/// Group attributes survive and do not disturb the hierarchy.
#[tokio::test]
async fn test_group_attributes_keep_hierarchy() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let acme = env.store.create_group("acme", None).await?;
    let mut engineering = env.store.create_group("engineering", Some(&acme)).await?;

    env.store
        .set_group_attribute(&mut engineering, "description", values(&["Builders"]))
        .await?;
    env.store
        .remove_group_attribute(&mut engineering, "description")
        .await?;
    env.store
        .set_group_attribute(&mut engineering, "businessCategory", values(&["R&D"]))
        .await?;

    assert_eq!(engineering.parent_name(), Some("acme"));
    let fetched = env
        .store
        .get_group("engineering")
        .await?
        .ok_or_else(|| anyhow::anyhow!("group missing"))?;
    assert_eq!(fetched.parent_name(), Some("acme"));
    assert_eq!(fetched.first_attribute("businessCategory"), Some("R&D"));
    assert!(fetched.attribute_values("description").is_none());
    assert_eq!(
        env.members(&format!("cn=acme,{GROUPS_DN}"))?,
        vec![format!("cn=engineering,{GROUPS_DN}")]
    );

    Ok(())
}

/// Each accessor call is its own write-back.
#[tokio::test]
async fn test_one_write_back_per_call() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut role = env.store.create_role("admin").await?;
    env.directory.clear_operations();

    env.store
        .set_role_attribute(&mut role, "description", values(&["Administrators"]))
        .await?;
    env.store
        .set_role_attribute(&mut role, "owner", values(&["JDoe"]))
        .await?;
    env.store.remove_role_attribute(&mut role, "missing").await?;

    assert_eq!(env.rebinds(), 2);

    Ok(())
}

/// Bound handles fold several changes into one write-back.
#[tokio::test]
async fn test_bound_handle_batches() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    env.store.create_group("acme", None).await?;
    let mut group = env
        .store
        .bound_group("acme")
        .await?
        .ok_or_else(|| anyhow::anyhow!("group missing"))?;
    env.directory.clear_operations();

    group.set_attribute("description", values(&["Holding"]))?;
    group.set_attribute("l", values(&["Springfield"]))?;
    group.remove_attribute("description")?;
    assert_eq!(group.pending(), 3);

    assert!(env.store.commit(&mut group).await?);
    assert!(!env.store.commit(&mut group).await?);
    assert_eq!(env.rebinds(), 1);

    let stored = env.entry(&format!("cn=acme,{GROUPS_DN}"))?;
    assert_eq!(stored.first("l"), Some("Springfield"));
    assert!(!stored.has_attr("description"));

    env.store.unbind(&mut group).await?;
    assert_eq!(group.state(), EntityState::Removed);
    assert!(env.store.commit(&mut group).await.is_err());

    Ok(())
}

/// A write-back failure reaches the caller.
#[tokio::test]
async fn test_write_back_failure_propagates() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut role = env.store.create_role("admin").await?;
    env.directory.fail_next(OpKind::Rebind, 53);

    let err = env
        .store
        .set_role_attribute(&mut role, "description", values(&["Administrators"]))
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Protocol(_)), "{err}");
    assert!(role.attribute_values("description").is_none());

    Ok(())
}

/// Attribute names owned by the mapping cannot be overwritten.
#[tokio::test]
async fn test_reserved_attribute_names() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut user = env.store.create_user("John Doe").await?;

    env.store
        .set_user_attribute(&mut user, "cn", values(&["Impostor"]))
        .await?;

    let stored = env.entry(&format!("uid=JDoe,{USERS_DN}"))?;
    assert_eq!(stored.get("cn").map(<[String]>::to_vec), Some(values(&["John Doe"])));

    Ok(())
}

/// Handles owned by another store are rejected; unlinked ones are
/// resolved by name.
#[tokio::test]
async fn test_handle_ownership() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let other = env.second_store()?;
    let mut foreign = other.create_role("admin").await?;

    let err = env
        .store
        .set_role_attribute(&mut foreign, "description", values(&["x"]))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::TypeMismatch { entity_type: "Role", .. }));

    let mut local = Role::new("admin");
    env.store
        .set_role_attribute(&mut local, "description", values(&["Administrators"]))
        .await?;
    assert!(local
        .link
        .as_ref()
        .is_some_and(|link| link.belongs_to(env.store.id())));

    let err = env
        .store
        .get_group_attributes(&Group::new("missing"))
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    Ok(())
}

/// A parent handle taken before a child was added still keeps the child
/// when its attributes change.
#[tokio::test]
async fn test_group_attributes_keep_later_children() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut acme = env.store.create_group("acme", None).await?;
    env.store.create_group("engineering", Some(&acme)).await?;

    env.store
        .set_group_attribute(&mut acme, "description", values(&["Holding"]))
        .await?;

    assert!(acme.has_child("engineering"));
    assert_eq!(
        env.members(&format!("cn=acme,{GROUPS_DN}"))?,
        vec![format!("cn=engineering,{GROUPS_DN}")]
    );
    let engineering = env
        .store
        .get_group("engineering")
        .await?
        .ok_or_else(|| anyhow::anyhow!("group missing"))?;
    assert_eq!(engineering.parent_name(), Some("acme"));

    Ok(())
}

/// Role and group handles taken before a membership still keep it when
/// their attributes change.
#[tokio::test]
async fn test_attributes_keep_later_memberships() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let mut role = env.store.create_role("developer").await?;
    let user = env.store.create_user("John Doe").await?;
    let mut group = env.store.create_group("engineering", None).await?;
    env.store.create_membership(&role, &user, &group).await?;

    env.store
        .set_role_attribute(&mut role, "description", values(&["Builders"]))
        .await?;
    env.store
        .remove_group_attribute(&mut group, "description")
        .await?;

    assert!(role.has_member("JDoe"));
    assert_eq!(
        env.members(&format!("cn=developer,{ROLES_DN}"))?,
        vec![format!("uid=JDoe,{USERS_DN}")]
    );
    assert!(group.has_role("developer"));
    assert_eq!(
        env.members(&format!("cn=engineering,{GROUPS_DN}"))?,
        vec![format!("cn=developer,{ROLES_DN}")]
    );

    Ok(())
}
