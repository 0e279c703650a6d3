use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{UpdateUserRequest, UserList},
        auth::{LoginRequest, LoginResponse, RegisterRequest, UpdateProfileRequest, UserEnvelope},
        products::{
            CategoryList, CreateProductRequest, ProductEnvelope, ProductPage, SearchInfo,
            SearchPage, SuggestionList, UpdateProductRequest,
        },
    },
    models::{Product, Role, User},
    response::{MessageResponse, PageMeta},
    routes::{admin, auth, health, my, params, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::logout,
        auth::get_profile,
        auth::update_profile,
        products::list_products,
        products::search_products,
        products::search_suggestions,
        products::list_categories,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        my::my_products,
        admin::list_users,
        admin::update_user,
        admin::list_all_products
    ),
    components(
        schemas(
            User,
            Role,
            Product,
            PageMeta,
            MessageResponse,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            UpdateProfileRequest,
            UserEnvelope,
            UpdateUserRequest,
            UserList,
            CreateProductRequest,
            UpdateProductRequest,
            ProductEnvelope,
            ProductPage,
            SearchInfo,
            SearchPage,
            CategoryList,
            SuggestionList,
            params::Pagination,
            params::ProductQuery,
            health::HealthData
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Registration, login and profile"),
        (name = "Products", description = "Catalog browsing, search and product management"),
        (name = "Admin", description = "User administration and the unrestricted product listing"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
