//! Group hierarchy tests.

use idm_ldap::{DirectoryEntry, OpKind};
use idm_model::Group;
use idm_store::IdentityStore;

use crate::common::{TestEnv, GROUPS_DN};

/// "engineering" created below "acme" resolves "acme" as its parent.
#[tokio::test]
async fn test_group_parent_resolution() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let acme = env.store.create_group("acme", None).await?;

    let engineering = env.store.create_group("engineering", Some(&acme)).await?;
    assert_eq!(engineering.parent_name(), Some("acme"));

    let fetched = env
        .store
        .get_group("engineering")
        .await?
        .ok_or_else(|| anyhow::anyhow!("engineering not found"))?;
    assert_eq!(fetched.parent_name(), Some("acme"));
    assert_eq!(fetched.path(), "/acme/engineering");

    Ok(())
}

/// The parent side holds the relationship; the child entry does not.
#[tokio::test]
async fn test_parent_lists_child() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let acme = env.store.create_group("acme", None).await?;
    env.store.create_group("engineering", Some(&acme)).await?;

    let acme = env
        .store
        .get_group("acme")
        .await?
        .ok_or_else(|| anyhow::anyhow!("acme not found"))?;
    assert!(acme.has_child("engineering"));
    assert!(acme.is_top_level());

    assert_eq!(
        env.members(&format!("cn=acme,{GROUPS_DN}"))?,
        vec![format!("cn=engineering,{GROUPS_DN}")]
    );
    assert!(env.members(&format!("cn=engineering,{GROUPS_DN}"))?.is_empty());

    Ok(())
}

/// Deep hierarchies resolve the whole chain.
#[tokio::test]
async fn test_nested_groups() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let acme = env.store.create_group("acme", None).await?;
    let engineering = env.store.create_group("engineering", Some(&acme)).await?;
    let platform = env
        .store
        .create_group("platform", Some(&engineering))
        .await?;

    assert_eq!(platform.path(), "/acme/engineering/platform");

    let fetched = env
        .store
        .get_group("platform")
        .await?
        .ok_or_else(|| anyhow::anyhow!("platform not found"))?;
    assert_eq!(fetched.path(), "/acme/engineering/platform");

    Ok(())
}

/// A missing parent fails before the child is written.
#[tokio::test]
async fn test_missing_parent() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    let err = env
        .store
        .create_group("engineering", Some(&Group::new("acme")))
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(env.store.get_group("engineering").await?.is_none());

    Ok(())
}

/// Group names are unique.
#[tokio::test]
async fn test_duplicate_group() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    env.store.create_group("acme", None).await?;

    let err = env.store.create_group("acme", None).await.unwrap_err();
    assert!(err.is_duplicate());

    Ok(())
}

/// Removing a child unlinks it from its parent.
#[tokio::test]
async fn test_remove_child_group() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let acme = env.store.create_group("acme", None).await?;
    let engineering = env.store.create_group("engineering", Some(&acme)).await?;

    env.store.remove_group(&engineering).await?;

    assert!(env.store.get_group("engineering").await?.is_none());
    let acme = env
        .store
        .get_group("acme")
        .await?
        .ok_or_else(|| anyhow::anyhow!("acme not found"))?;
    assert!(acme.children.is_empty());
    assert!(!env.entry(&format!("cn=acme,{GROUPS_DN}"))?.has_attr("member"));

    Ok(())
}

/// Removing a parent leaves its children as top-level groups.
#[tokio::test]
async fn test_remove_parent_group() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let acme = env.store.create_group("acme", None).await?;
    env.store.create_group("engineering", Some(&acme)).await?;

    env.store.remove_group(&acme).await?;

    let engineering = env
        .store
        .get_group("engineering")
        .await?
        .ok_or_else(|| anyhow::anyhow!("engineering not found"))?;
    assert!(engineering.is_top_level());

    Ok(())
}

/// Group creation checks for the container once per call and creates it
/// only the first time.
#[tokio::test]
async fn test_group_container_created_once() -> anyhow::Result<()> {
    let env = TestEnv::new()?;

    env.store.create_group("acme", None).await?;
    env.store.create_group("globex", None).await?;

    assert_eq!(env.directory.count(OpKind::CreateSubcontext), 1);
    assert!(env.entry(GROUPS_DN)?.has_object_class("organizationalUnit"));

    Ok(())
}

/// A container lookup that fails for any reason other than absence is
/// surfaced, and nothing is created.
#[tokio::test]
async fn test_container_lookup_failure() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    env.directory.fail_next(OpKind::Lookup, 50);

    let err = env.store.create_group("acme", None).await.unwrap_err();

    assert!(err.is_fatal(), "{err}");
    assert!(!env.directory.contains(GROUPS_DN));

    Ok(())
}

/// Several parents for one group resolve to one of them without failing.
#[tokio::test]
async fn test_group_with_two_parents() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    let acme = env.store.create_group("acme", None).await?;
    env.store.create_group("globex", None).await?;
    env.store.create_group("engineering", Some(&acme)).await?;

    let mut globex = env.entry(&format!("cn=globex,{GROUPS_DN}"))?;
    globex.set("member", vec![format!("cn=engineering,{GROUPS_DN}")]);
    env.directory.insert(globex);

    let engineering = env
        .store
        .get_group("engineering")
        .await?
        .ok_or_else(|| anyhow::anyhow!("engineering not found"))?;
    let parent = engineering.parent_name().unwrap_or_default();
    assert!(parent == "acme" || parent == "globex", "{parent}");

    Ok(())
}

/// Entries without a naming attribute surface as corruption.
#[tokio::test]
async fn test_corrupt_group_entry() -> anyhow::Result<()> {
    let env = TestEnv::new()?;
    env.store.create_group("acme", None).await?;
    env.directory.insert(
        DirectoryEntry::new(format!("ou=broken,{GROUPS_DN}"))
            .with_attr("ou", vec!["broken".to_string()])
            .with_attr("member", vec![format!("cn=acme,{GROUPS_DN}")]),
    );

    let err = env.store.get_group("acme").await.unwrap_err();
    assert!(
        matches!(err, idm_store::StoreError::Corrupt { entity_type: "Group", .. }),
        "{err}"
    );

    Ok(())
}
