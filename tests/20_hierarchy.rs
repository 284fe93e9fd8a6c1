mod common;

use anyhow::Result;
use axum::http::StatusCode;
use serde_json::json;

use common::TestApp;
use org_hierarchy_api::hierarchy::Role;

#[tokio::test]
async fn user_placed_by_department_inherits_full_chain() -> Result<()> {
    let app = TestApp::new()?;
    let tree = app.seed_tree("ACME").await?;
    let token = app.manager_token(tree.shop)?;

    let res = app
        .post(
            "/api/v1/users",
            &token,
            json!({
                "username": "gail",
                "email": "gail@example.com",
                "password": "long-enough",
                "role": "head_of_department",
                "department_id": tree.department,
            }),
        )
        .await?;
    assert_eq!(res.status, StatusCode::CREATED, "{:?}", res.body);
    assert_eq!(res.data()["shop_id"], tree.shop.to_string());
    assert_eq!(res.data()["region_id"], tree.region.to_string());
    assert_eq!(res.data()["branch_id"], tree.branch.to_string());
    assert_eq!(res.data()["department_id"], tree.department.to_string());
    Ok(())
}

#[tokio::test]
async fn region_manager_cannot_reach_another_region() -> Result<()> {
    let app = TestApp::new()?;
    let tree = app.seed_tree("ACME").await?;
    let (other_region, _) = app.add_region(tree.shop, "South").await?;
    let token = app.token(Role::RegionManager, tree.shop, Some(other_region), None, None)?;

    let res = app.get(&format!("/api/v1/branches/{}", tree.branch), &token).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.code(), "scope_mismatch");

    let own = app.get(&format!("/api/v1/regions/{}", other_region), &token).await?;
    assert_eq!(own.status, StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn branch_with_children_cannot_be_deleted() -> Result<()> {
    let app = TestApp::new()?;
    let tree = app.seed_tree("ACME").await?;
    let token = app.manager_token(tree.shop)?;

    let res = app.delete(&format!("/api/v1/branches/{}", tree.branch), &token).await?;
    assert_eq!(res.status, StatusCode::CONFLICT);
    assert_eq!(res.code(), "branch_in_use");

    // Branch is untouched.
    let res = app.get(&format!("/api/v1/branches/{}", tree.branch), &token).await?;
    assert_eq!(res.status, StatusCode::OK);

    let res = app.delete(&format!("/api/v1/departments/{}", tree.department), &token).await?;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    let res = app.delete(&format!("/api/v1/branches/{}", tree.branch), &token).await?;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn only_managers_create_shops() -> Result<()> {
    let app = TestApp::new()?;
    let tree = app.seed_tree("ACME").await?;
    let token = app.token(Role::BranchManager, tree.shop, Some(tree.region), Some(tree.branch), None)?;

    let res = app.post("/api/v1/shops", &token, json!({ "name": "Rogue", "code": "ROGUE" })).await?;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn unknown_ids_are_not_found() -> Result<()> {
    let app = TestApp::new()?;
    let tree = app.seed_tree("ACME").await?;
    let token = app.manager_token(tree.shop)?;

    let res = app.get(&format!("/api/v1/departments/{}", uuid::Uuid::new_v4()), &token).await?;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn duplicate_shop_code_conflicts() -> Result<()> {
    let app = TestApp::new()?;
    app.seed_tree("ACME").await?;
    let token = app.manager_token(uuid::Uuid::new_v4())?;

    let res = app.post("/api/v1/shops", &token, json!({ "name": "Again", "code": "ACME" })).await?;
    assert_eq!(res.status, StatusCode::CONFLICT);
    Ok(())
}
