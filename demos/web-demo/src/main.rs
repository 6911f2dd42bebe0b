use axum::{middleware, Json};
use loadkit_core::prelude::*;
use loadkit_web::prelude::*;
use serde::Serialize;
use std::sync::Arc;

// ==================== 实体 ====================

#[derive(Entity, Debug, Clone, Serialize)]
struct Customer {
    #[id]
    id: i64,
    name: String,
}

#[derive(Entity, Debug, Clone, Serialize)]
struct Product {
    #[id("sku")]
    code: String,
    title: String,
}

// ==================== 控制器 ====================

struct ShopController {
    currency: &'static str,
}

#[derive(Serialize)]
struct Quote {
    customer: String,
    product: String,
    currency: &'static str,
}

fn seed_store() -> InMemoryEntityStore {
    let store = InMemoryEntityStore::new();
    store.insert(
        1_i64,
        Customer {
            id: 1,
            name: "Alice".to_string(),
        },
    );
    store.insert(
        2_i64,
        Customer {
            id: 2,
            name: "Bob".to_string(),
        },
    );
    store.insert(
        "LAMP-01",
        Product {
            code: "LAMP-01".to_string(),
            title: "Desk lamp".to_string(),
        },
    );
    store
}

fn routes() -> Vec<Route> {
    vec![
        Route::new(
            ControllerMethod::builder("customers#show")
                .load::<Customer>("customer")
                .build(),
            ShopController { currency: "EUR" },
            |inv| match inv.entity::<Customer>("customer") {
                Some(customer) => Json(customer.as_ref().clone()).into_response(),
                None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            },
        ),
        Route::new(
            ControllerMethod::builder("quotes#show")
                .load::<Customer>("customer")
                .load::<Product>("product")
                .param::<String>("note")
                .build(),
            ShopController { currency: "EUR" },
            |inv| {
                let (Some(customer), Some(product), Some(shop)) = (
                    inv.entity::<Customer>("customer"),
                    inv.entity::<Product>("product"),
                    inv.controller::<ShopController>(),
                ) else {
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                };

                Json(Quote {
                    customer: customer.name.clone(),
                    product: product.title.clone(),
                    currency: shop.currency,
                })
                .into_response()
            },
        ),
    ]
}

#[tokio::main]
async fn main() -> ApplicationResult<()> {
    let config_file = if std::path::Path::new("demos/web-demo/application.toml").exists() {
        "demos/web-demo/application.toml"
    } else {
        "application.toml"
    };

    let env = Application::new("WebDemo")
        .config_file(config_file)
        .env_prefix("WEB_")
        .run()?;

    let loader = EntityLoader::new(
        Arc::new(MetadataRegistry::from_inventory()),
        Arc::new(ConverterRegistry::with_defaults()),
        Arc::new(seed_store()),
    );

    let dispatcher = Arc::new(
        routes()
            .into_iter()
            .fold(Dispatcher::from_environment(&env, loader), Dispatcher::route),
    );

    let router = Router::new()
        .route("/customers", dispatcher.handler("customers#show"))
        .route("/quotes", dispatcher.handler("quotes#show"))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id));

    tracing::info!("Try: GET /customers?customer.id=1");
    tracing::info!("Try: GET /quotes?customer.id=2&product.sku=LAMP-01");

    serve(router, &ServerProperties::from_environment(&env)).await
}
