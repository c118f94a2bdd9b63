/// Integration tests for the tag endpoints
///
/// Require `DATABASE_URL`; each test returns early without it.

mod common;

use axum::http::{Method, StatusCode};
use common::TestContext;
use recipe_shared::models::recipe::{NewRecipe, Recipe};
use recipe_shared::models::tag::Tag;
use rust_decimal::Decimal;
use serde_json::json;

const TAGS_URL: &str = "/api/recipe/tags";

fn detail_url(id: i64) -> String {
    format!("{}/{}", TAGS_URL, id)
}

#[tokio::test]
async fn test_auth_required() {
    let Some(ctx) = TestContext::new().await else { return };

    let (status, _) = ctx.send_as(None, Method::GET, TAGS_URL, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_retrieve_tags_ordered_by_name_descending() {
    let Some(ctx) = TestContext::new().await else { return };

    Tag::create(&ctx.db, ctx.user.id, "Vegan").await.unwrap();
    Tag::create(&ctx.db, ctx.user.id, "Dessert").await.unwrap();

    let (status, body) = ctx.send(Method::GET, TAGS_URL, None).await;
    assert_eq!(status, StatusCode::OK);

    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|tag| tag["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Vegan", "Dessert"]);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_tags_limited_to_user() {
    let Some(ctx) = TestContext::new().await else { return };

    let other = ctx.other_user().await;
    Tag::create(&ctx.db, other.id, "Fruity").await.unwrap();
    let tag = Tag::create(&ctx.db, ctx.user.id, "Comfort Food").await.unwrap();

    let (status, body) = ctx.send(Method::GET, TAGS_URL, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{ "id": tag.id, "name": "Comfort Food" }]));

    recipe_shared::models::user::User::delete(&ctx.db, other.id)
        .await
        .unwrap();
    ctx.cleanup().await;
}

#[tokio::test]
async fn test_other_users_tag_is_not_found() {
    let Some(ctx) = TestContext::new().await else { return };

    let other = ctx.other_user().await;
    let foreign = Tag::create(&ctx.db, other.id, "Private").await.unwrap();

    let (status, _) = ctx.send(Method::GET, &detail_url(foreign.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .send(Method::PATCH, &detail_url(foreign.id), Some(json!({ "name": "Mine" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx.send(Method::DELETE, &detail_url(foreign.id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    recipe_shared::models::user::User::delete(&ctx.db, other.id)
        .await
        .unwrap();
    ctx.cleanup().await;
}

#[tokio::test]
async fn test_update_tag() {
    let Some(ctx) = TestContext::new().await else { return };

    let tag = Tag::create(&ctx.db, ctx.user.id, "After Dinner").await.unwrap();

    let (status, body) = ctx
        .send(Method::PATCH, &detail_url(tag.id), Some(json!({ "name": "Dessert" })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Dessert");

    let reloaded = Tag::find_for_user(&ctx.db, tag.id, ctx.user.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.name, "Dessert");

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_put_requires_name() {
    let Some(ctx) = TestContext::new().await else { return };

    let tag = Tag::create(&ctx.db, ctx.user.id, "Breakfast").await.unwrap();

    let (status, body) = ctx
        .send(Method::PUT, &detail_url(tag.id), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "name");

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_rename_to_existing_name_is_rejected() {
    let Some(ctx) = TestContext::new().await else { return };

    Tag::create(&ctx.db, ctx.user.id, "Lunch").await.unwrap();
    let tag = Tag::create(&ctx.db, ctx.user.id, "Brunch").await.unwrap();

    let (status, body) = ctx
        .send(Method::PATCH, &detail_url(tag.id), Some(json!({ "name": "Lunch" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "name");

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_delete_tag() {
    let Some(ctx) = TestContext::new().await else { return };

    let tag = Tag::create(&ctx.db, ctx.user.id, "Breakfast").await.unwrap();

    let (status, _) = ctx.send(Method::DELETE, &detail_url(tag.id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let tags = Tag::list_for_user(&ctx.db, ctx.user.id).await.unwrap();
    assert!(tags.is_empty());

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_filter_tags_assigned_to_recipes() {
    let Some(ctx) = TestContext::new().await else { return };

    Tag::create(&ctx.db, ctx.user.id, "Lunch").await.unwrap();

    let mut data = NewRecipe::new("Green Eggs on Toast", 10, Decimal::new(250, 2));
    data.tags = vec!["Breakfast".to_string()];
    Recipe::create(&ctx.db, ctx.user.id, data).await.unwrap();

    let (status, body) = ctx
        .send(Method::GET, &format!("{}?assigned_only=1", TAGS_URL), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let names: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|tag| tag["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Breakfast"]);

    ctx.cleanup().await;
}

#[tokio::test]
async fn test_filtered_tags_are_unique() {
    let Some(ctx) = TestContext::new().await else { return };

    Tag::create(&ctx.db, ctx.user.id, "Dinner").await.unwrap();

    for title in ["Pancakes", "Porridge"] {
        let mut data = NewRecipe::new(title, 5, Decimal::new(500, 2));
        data.tags = vec!["Breakfast".to_string()];
        Recipe::create(&ctx.db, ctx.user.id, data).await.unwrap();
    }

    let (status, body) = ctx
        .send(Method::GET, &format!("{}?assigned_only=1", TAGS_URL), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);

    ctx.cleanup().await;
}
