//! Storefront flows: login/register, the cached catalog, reviews, cart
//! checkout, the wishlist's independence from the session, and the admin
//! surface.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use shoplive_client::{
    ClientError, KeyValueStore, MemoryStore, OrdersClient, ProductsClient, ReviewsClient,
    SessionEvent, SessionManager, Wishlist,
};
use shoplive_core::{Cart, NewReview};
use shoplive_integration_tests::{MockBackend, sample_product};

fn fresh_session(backend: &MockBackend) -> (SessionManager, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let session = SessionManager::new(
        backend.client_config(),
        Arc::clone(&store) as Arc<dyn KeyValueStore>,
    );
    (session, store)
}

#[tokio::test]
async fn test_login_persists_credentials_and_emits_event() {
    let backend = MockBackend::spawn().await;
    let (session, _store) = fresh_session(&backend);
    let mut events = session.events();

    let pair = session.login("ada", "hunter2").await.unwrap();

    assert_eq!(pair.username, "ada");
    assert_eq!(pair.customer_id, "c1");
    assert!(session.is_logged_in().unwrap());
    assert_eq!(session.current_username().unwrap().as_deref(), Some("ada"));
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::LoggedIn {
            username: "ada".to_string()
        }
    );
}

#[tokio::test]
async fn test_login_rejection_stores_nothing() {
    let backend = MockBackend::spawn().await;
    let (session, store) = fresh_session(&backend);

    let err = session.login("ada", "").await.unwrap_err();

    assert!(matches!(err, ClientError::Api { status: 401, .. }));
    assert!(store.is_empty());
    assert!(!session.is_logged_in().unwrap());
}

#[tokio::test]
async fn test_register_round_trip() {
    let backend = MockBackend::spawn().await;
    let (session, _store) = fresh_session(&backend);

    session
        .register("ada", "ada@example.com", "hunter2")
        .await
        .unwrap();

    let err = session.register("ada", "", "hunter2").await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 400, .. }));
}

#[tokio::test]
async fn test_product_listing_and_images_are_cached() {
    let backend = MockBackend::spawn().await;
    backend.set_products(vec![sample_product("p1")]);
    let (session, _store) = fresh_session(&backend);
    session.login("ada", "hunter2").await.unwrap();

    let products = ProductsClient::new(session);

    assert_eq!(products.list().await.unwrap().len(), 1);
    assert_eq!(products.list().await.unwrap().len(), 1);
    assert_eq!(backend.products_requests(), 1, "second listing from cache");

    let first = products.image("p1").await.unwrap();
    let second = products.image("p1").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(backend.image_requests(), 1, "second image from cache");

    products.invalidate();
    products.list().await.unwrap();
    assert_eq!(backend.products_requests(), 2);
}

#[tokio::test]
async fn test_review_submit_and_list() {
    let backend = MockBackend::spawn().await;
    let (session, _store) = fresh_session(&backend);
    session.login("ada", "hunter2").await.unwrap();

    let reviews = ReviewsClient::new(session);

    let saved = reviews
        .submit("p1", &NewReview::new("Great mug", 5))
        .await
        .unwrap();
    assert_eq!(saved.username, "ada");
    assert_eq!(saved.stars, 5);

    let listed = reviews.list("p1").await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed.first().unwrap().text, "Great mug");
}

#[tokio::test]
async fn test_cart_checkout_places_order() {
    let backend = MockBackend::spawn().await;
    let catalog = vec![sample_product("p1"), sample_product("p2")];
    backend.set_products(catalog.clone());

    let (session, _store) = fresh_session(&backend);
    session.login("ada", "hunter2").await.unwrap();
    let orders = OrdersClient::new(session);

    let mut cart = Cart::new();
    cart.add("p1");
    cart.add("p1");
    cart.add("p2");

    let lines = cart.checkout_lines(&catalog);
    orders.place(&lines).await.unwrap();
    cart.clear();

    let placed = backend.placed_orders();
    assert_eq!(placed.len(), 1);
    assert_eq!(placed.first().unwrap().len(), 2);
    assert!(cart.is_empty());
}

#[tokio::test]
async fn test_empty_cart_checkout_is_rejected_client_side() {
    let backend = MockBackend::spawn().await;
    let (session, _store) = fresh_session(&backend);
    session.login("ada", "hunter2").await.unwrap();
    let orders = OrdersClient::new(session);

    let err = orders.place(&[]).await.unwrap_err();
    assert!(matches!(err, ClientError::Api { status: 400, .. }));
    assert!(backend.placed_orders().is_empty());
}

#[tokio::test]
async fn test_wishlist_survives_logout() {
    let backend = MockBackend::spawn().await;
    let (session, store) = fresh_session(&backend);
    session.login("ada", "hunter2").await.unwrap();

    let wishlist = Wishlist::new(Arc::clone(&store) as Arc<dyn KeyValueStore>);
    wishlist.toggle("p1").unwrap();
    wishlist.toggle("p2").unwrap();

    session.force_logout();

    assert!(!session.is_logged_in().unwrap());
    assert_eq!(wishlist.items().unwrap(), vec!["p1", "p2"]);
}

#[tokio::test]
async fn test_admin_stats_and_catalog_management() {
    let backend = MockBackend::spawn().await;
    backend.set_products(vec![sample_product("p1")]);
    let (session, _store) = fresh_session(&backend);
    session.login("ada", "hunter2").await.unwrap();

    let admin = shoplive_client::AdminClient::new(session);

    let stats = admin.stats().await.unwrap();
    assert_eq!(stats.products, 1);

    let customers = admin.customers().await.unwrap();
    assert_eq!(customers.first().unwrap().name, "ada");

    admin.delete_product("p1").await.unwrap();
    admin.delete_customer("c1").await.unwrap();
}
