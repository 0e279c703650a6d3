//! Search, filter, sort and paginate over the product catalog.
//!
//! A [`CatalogQuery`] is built from a visibility [`Scope`] and the raw query
//! string. Each filter contributes an optional predicate; the present ones are
//! AND-ed together. Running the query is read-only.

use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::{Expr, SimpleExpr};
use sea_orm::{
    ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, SelectTwo,
};

use crate::{
    dto::products::ProductPage,
    entity::{
        products::{self, Column},
        users, Products, Users,
    },
    error::AppResult,
    models::product_from_entity,
    response::PageMeta,
    routes::params::{ProductFilters, ProductQuery, ProductSortBy, SortOrder, SortSpec},
};

/// Which rows a caller may see before any user-supplied filter applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Active products only.
    Public,
    /// Every product created by this user, active or not.
    Owner(i32),
    /// Every product. `include_inactive` is accepted for compatibility but
    /// admins always see inactive rows.
    Admin { include_inactive: bool },
}

#[derive(Debug, Clone)]
pub struct CatalogQuery {
    pub scope: Scope,
    pub filters: ProductFilters,
    pub sort: SortSpec,
    pub page: u64,
    pub per_page: u64,
    pub offset: u64,
}

impl CatalogQuery {
    pub fn new(scope: Scope, params: &ProductQuery, default_sort: &str) -> Self {
        let (page, per_page, offset) = params.pagination.normalize();
        if let Scope::Admin {
            include_inactive: false,
        } = scope
        {
            tracing::debug!("include_inactive=false has no effect on the admin listing");
        }
        Self {
            scope,
            filters: params.filters(),
            sort: params.sort(default_sort),
            page,
            per_page,
            offset,
        }
    }

    fn scope_predicate(&self) -> Option<SimpleExpr> {
        match self.scope {
            Scope::Public => Some(Column::IsActive.eq(true)),
            Scope::Owner(user_id) => Some(Column::CreatedBy.eq(user_id)),
            Scope::Admin { .. } => None,
        }
    }

    /// Scope first, then user filters, in a fixed order.
    fn predicates(&self) -> Vec<Option<SimpleExpr>> {
        let f = &self.filters;
        vec![
            self.scope_predicate(),
            f.q.as_deref().map(text_search),
            f.category
                .as_deref()
                .map(|c| product_col(Column::Category).ilike(contains(c))),
            f.min_price.map(|p| Column::Price.gte(p)),
            f.max_price.map(|p| Column::Price.lte(p)),
            f.date_from.map(|d| Column::CreatedAt.gte(d)),
            f.date_to.map(|d| Column::CreatedAt.lte(d)),
            f.created_by.map(created_by),
            f.creator_username.as_deref().map(|name| {
                Expr::col((Users, users::Column::Username)).ilike(contains(name))
            }),
        ]
    }

    pub fn condition(&self) -> Condition {
        self.predicates()
            .into_iter()
            .flatten()
            .fold(Condition::all(), |cond, expr| cond.add(expr))
    }

    /// Products joined to their creator, filtered and ordered, not yet paginated.
    pub fn select(&self) -> SelectTwo<products::Entity, users::Entity> {
        let finder = Products::find()
            .find_also_related(Users)
            .filter(self.condition());
        apply_sort(finder, self.sort)
    }

    pub async fn fetch<C: ConnectionTrait>(&self, db: &C) -> AppResult<ProductPage> {
        let finder = self.select();
        let total = finder.clone().count(db).await?;

        let products = finder
            .limit(self.per_page)
            .offset(self.offset)
            .all(db)
            .await?
            .into_iter()
            .map(|(product, creator)| product_from_entity(product, creator))
            .collect();

        Ok(ProductPage {
            products,
            pagination: PageMeta::new(self.page, self.per_page, total),
        })
    }
}

/// Count of products visible in the public catalog.
pub async fn count_active<C: ConnectionTrait>(db: &C) -> AppResult<u64> {
    let total = active_products().count(db).await?;
    Ok(total)
}

pub fn active_products() -> Select<products::Entity> {
    Products::find().filter(Column::IsActive.eq(true))
}

fn apply_sort(
    finder: SelectTwo<products::Entity, users::Entity>,
    sort: SortSpec,
) -> SelectTwo<products::Entity, users::Entity> {
    let sort_col = match sort.by {
        ProductSortBy::Name => Column::Name,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::UpdatedAt => Column::UpdatedAt,
        ProductSortBy::Category => Column::Category,
    };
    let finder = match sort.order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };
    // tie-breaker keeps pages stable
    finder.order_by_asc(Column::Id)
}

fn product_col(col: Column) -> Expr {
    Expr::col((Products, col))
}

fn contains(term: &str) -> String {
    format!("%{term}%")
}

/// Ids outside the column's range cannot match any row.
fn created_by(id: i64) -> SimpleExpr {
    match i32::try_from(id) {
        Ok(id) => Column::CreatedBy.eq(id),
        Err(_) => Expr::val(false).into(),
    }
}

fn text_search(term: &str) -> SimpleExpr {
    let pattern = contains(term);
    product_col(Column::Name)
        .ilike(pattern.clone())
        .or(product_col(Column::Description).ilike(pattern.clone()))
        .or(product_col(Column::Tags).ilike(pattern))
}
