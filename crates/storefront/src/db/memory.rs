//! In-memory storage adapter.
//!
//! All tables live behind one `tokio` mutex. A checkout unit holds that lock
//! for its whole lifetime and works on a copy of the tables, which replaces
//! the shared state on commit. Concurrent checkouts therefore serialise, and
//! a dropped unit leaves no trace.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use riffhouse_core::{
    CartId, CartItemId, Email, ProductId, ProductStatus, Quantity, ReceiptCode, ReceiptId, Stock,
    UserId, UserRole,
};

use super::RepositoryError;
use super::ports::{
    CartRepository, CheckoutStore, CheckoutUnit, HealthCheck, ProductRepository,
    ReceiptRepository, Reservation, UserRepository,
};
use crate::models::{
    Cart, CartItem, NewProduct, NewReceipt, NewUser, Product, ProductPage, ProductQuery,
    ProductSort, ProductUpdate, ProfileUpdate, Receipt, User,
};

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password_hash: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    products: BTreeMap<ProductId, Product>,
    carts: BTreeMap<CartId, Cart>,
    users: BTreeMap<UserId, StoredUser>,
    receipts: BTreeMap<ReceiptId, Receipt>,
    seq: Sequences,
}

#[derive(Debug, Clone, Default)]
struct Sequences {
    product: i32,
    cart: i32,
    cart_item: i32,
    user: i32,
    receipt: i32,
}

fn next(seq: &mut i32) -> i32 {
    *seq += 1;
    *seq
}

impl Tables {
    fn cart_mut(&mut self, id: CartId) -> Result<&mut Cart, RepositoryError> {
        self.carts.get_mut(&id).ok_or(RepositoryError::NotFound)
    }

    fn cart_for_user(&self, user: UserId) -> Option<&Cart> {
        self.carts.values().find(|cart| cart.user_id == user)
    }

    fn create_cart(&mut self, user: UserId) -> Cart {
        let now = Utc::now();
        let cart = Cart {
            id: CartId::new(next(&mut self.seq.cart)),
            user_id: user,
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.carts.insert(cart.id, cart.clone());
        cart
    }

    fn email_taken(&self, email: &Email, except: Option<UserId>) -> bool {
        self.users
            .values()
            .any(|stored| &stored.user.email == email && Some(stored.user.id) != except)
    }

    fn code_taken(&self, code: &str, except: Option<ProductId>) -> bool {
        self.products
            .values()
            .any(|p| p.code == code && Some(p.id) != except)
    }
}

/// Process-local storage. Clones share the same tables.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite a stored line quantity without validation.
    #[cfg(test)]
    pub(crate) async fn force_item_quantity(&self, cart: CartId, item: CartItemId, quantity: i32) {
        let mut tables = self.tables.lock().await;
        if let Some(line) = tables
            .carts
            .get_mut(&cart)
            .and_then(|c| c.items.iter_mut().find(|i| i.id == item))
        {
            line.quantity = quantity;
        }
    }
}

#[async_trait]
impl ProductRepository for MemoryStore {
    async fn list(&self, query: &ProductQuery) -> Result<ProductPage, RepositoryError> {
        let tables = self.tables.lock().await;
        let mut matches: Vec<&Product> = tables
            .products
            .values()
            .filter(|p| query.include_archived || p.status == ProductStatus::Active)
            .filter(|p| query.category.as_ref().is_none_or(|c| &p.category == c))
            .collect();

        match query.sort {
            ProductSort::Title => matches.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id))),
            ProductSort::PriceAsc => {
                matches.sort_by(|a, b| a.price.cmp(&b.price).then(a.id.cmp(&b.id)));
            }
            ProductSort::PriceDesc => {
                matches.sort_by(|a, b| b.price.cmp(&a.price).then(a.id.cmp(&b.id)));
            }
            ProductSort::Newest => {
                matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
            }
        }

        let total = matches.len() as u64;
        let skip = usize::try_from(query.offset()).unwrap_or(usize::MAX);
        let products = matches
            .into_iter()
            .skip(skip)
            .take(query.limit as usize)
            .cloned()
            .collect();

        Ok(ProductPage {
            total,
            page: query.page,
            limit: query.limit,
            products,
        })
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.tables.lock().await.products.get(&id).cloned())
    }

    async fn categories(&self) -> Result<Vec<String>, RepositoryError> {
        let tables = self.tables.lock().await;
        let categories: BTreeSet<&String> = tables.products.values().map(|p| &p.category).collect();
        Ok(categories.into_iter().cloned().collect())
    }

    async fn create(&self, product: &NewProduct) -> Result<Product, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.code_taken(&product.code, None) {
            return Err(RepositoryError::Conflict("product code already exists".to_owned()));
        }
        let now = Utc::now();
        let created = Product {
            id: ProductId::new(next(&mut tables.seq.product)),
            title: product.title.clone(),
            description: product.description.clone(),
            price: product.price,
            stock: product.stock,
            category: product.category.clone(),
            brand: product.brand.clone(),
            model: product.model.clone(),
            code: product.code.clone(),
            image_url: product.image_url.clone(),
            status: product.status,
            created_at: now,
            updated_at: now,
        };
        tables.products.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update(
        &self,
        id: ProductId,
        changes: &ProductUpdate,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if let Some(code) = &changes.code
            && tables.code_taken(code, Some(id))
        {
            return Err(RepositoryError::Conflict("product code already exists".to_owned()));
        }
        Ok(tables.products.get_mut(&id).map(|product| {
            changes.apply_to(product);
            product.updated_at = Utc::now();
            product.clone()
        }))
    }

    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        Ok(self.tables.lock().await.products.remove(&id).is_some())
    }

    async fn set_stock(
        &self,
        id: ProductId,
        stock: Stock,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.products.get_mut(&id).map(|product| {
            if product.stock != stock {
                product.stock = stock;
                product.updated_at = Utc::now();
            }
            product.clone()
        }))
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn get_or_create(&self, user: UserId) -> Result<Cart, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if let Some(cart) = tables.cart_for_user(user) {
            return Ok(cart.clone());
        }
        Ok(tables.create_cart(user))
    }

    async fn get(&self, id: CartId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.tables.lock().await.carts.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Cart>, RepositoryError> {
        Ok(self.tables.lock().await.carts.values().cloned().collect())
    }

    async fn add_item(
        &self,
        cart: CartId,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<Cart, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let item_id = CartItemId::new(next(&mut tables.seq.cart_item));
        let cart = tables.cart_mut(cart)?;
        let now = Utc::now();

        if let Some(line) = cart.items.iter_mut().find(|i| i.product_id == product) {
            let merged = line
                .quantity()
                .map_or(quantity, |current| current.saturating_add(quantity));
            line.quantity = merged.get();
        } else {
            cart.items.push(CartItem {
                id: item_id,
                product_id: product,
                quantity: quantity.get(),
                added_at: now,
            });
        }
        cart.updated_at = now;
        Ok(cart.clone())
    }

    async fn set_item_quantity(
        &self,
        cart: CartId,
        item: CartItemId,
        quantity: Quantity,
    ) -> Result<Cart, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let cart = tables.cart_mut(cart)?;
        let line = cart
            .items
            .iter_mut()
            .find(|i| i.id == item)
            .ok_or(RepositoryError::NotFound)?;
        line.quantity = quantity.get();
        cart.updated_at = Utc::now();
        Ok(cart.clone())
    }

    async fn remove_item(&self, cart: CartId, item: CartItemId) -> Result<Cart, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let cart = tables.cart_mut(cart)?;
        let before = cart.items.len();
        cart.items.retain(|i| i.id != item);
        if cart.items.len() == before {
            return Err(RepositoryError::NotFound);
        }
        cart.updated_at = Utc::now();
        Ok(cart.clone())
    }

    async fn remove_product(
        &self,
        cart: CartId,
        product: ProductId,
    ) -> Result<Cart, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let cart = tables.cart_mut(cart)?;
        let before = cart.items.len();
        cart.items.retain(|i| i.product_id != product);
        if cart.items.len() == before {
            return Err(RepositoryError::NotFound);
        }
        cart.updated_at = Utc::now();
        Ok(cart.clone())
    }

    async fn clear(&self, cart: CartId) -> Result<Cart, RepositoryError> {
        let mut tables = self.tables.lock().await;
        let cart = tables.cart_mut(cart)?;
        cart.items.clear();
        cart.updated_at = Utc::now();
        Ok(cart.clone())
    }

    async fn delete(&self, cart: CartId) -> Result<bool, RepositoryError> {
        Ok(self.tables.lock().await.carts.remove(&cart).is_some())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.users.get(&id).map(|stored| stored.user.clone()))
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|stored| &stored.user.email == email)
            .map(|stored| stored.user.clone()))
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, Option<String>)>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .values()
            .find(|stored| &stored.user.email == email)
            .map(|stored| (stored.user.clone(), stored.password_hash.clone())))
    }

    async fn create(&self, new: &NewUser) -> Result<User, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.email_taken(&new.email, None) {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        let now = Utc::now();
        let user = User {
            id: UserId::new(next(&mut tables.seq.user)),
            first_name: new.first_name.clone(),
            last_name: new.last_name.clone(),
            email: new.email.clone(),
            age: new.age,
            role: new.role,
            provider: new.provider,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(
            user.id,
            StoredUser {
                user: user.clone(),
                password_hash: new.password_hash.clone(),
            },
        );
        tables.create_cart(user.id);
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: UserId,
        changes: &ProfileUpdate,
    ) -> Result<Option<User>, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if let Some(email) = &changes.email
            && tables.email_taken(email, Some(id))
        {
            return Err(RepositoryError::Conflict("email already exists".to_owned()));
        }
        Ok(tables.users.get_mut(&id).map(|stored| {
            let user = &mut stored.user;
            if let Some(first_name) = &changes.first_name {
                user.first_name.clone_from(first_name);
            }
            if let Some(last_name) = &changes.last_name {
                user.last_name.clone_from(last_name);
            }
            if let Some(email) = &changes.email {
                user.email = email.clone();
            }
            if changes.age.is_some() {
                user.age = changes.age;
            }
            user.updated_at = Utc::now();
            user.clone()
        }))
    }

    async fn set_role(&self, id: UserId, role: UserRole) -> Result<Option<User>, RepositoryError> {
        let mut tables = self.tables.lock().await;
        Ok(tables.users.get_mut(&id).map(|stored| {
            stored.user.role = role;
            stored.user.updated_at = Utc::now();
            stored.user.clone()
        }))
    }

    async fn delete(&self, id: UserId) -> Result<bool, RepositoryError> {
        let mut tables = self.tables.lock().await;
        if tables.users.remove(&id).is_none() {
            return Ok(false);
        }
        tables.carts.retain(|_, cart| cart.user_id != id);
        for receipt in tables.receipts.values_mut() {
            if receipt.purchaser_id == Some(id) {
                receipt.purchaser_id = None;
            }
        }
        Ok(true)
    }
}

#[async_trait]
impl ReceiptRepository for MemoryStore {
    async fn list_for_user(&self, user: UserId) -> Result<Vec<Receipt>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .receipts
            .values()
            .rev()
            .filter(|r| r.purchaser_id == Some(user))
            .cloned()
            .collect())
    }

    async fn get_for_user(
        &self,
        user: UserId,
        id: ReceiptId,
    ) -> Result<Option<Receipt>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .receipts
            .get(&id)
            .filter(|r| r.purchaser_id == Some(user))
            .cloned())
    }

    async fn get_by_code(&self, code: &ReceiptCode) -> Result<Option<Receipt>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables.receipts.values().find(|r| &r.code == code).cloned())
    }

    async fn list_recent(&self, limit: u32) -> Result<Vec<Receipt>, RepositoryError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .receipts
            .values()
            .rev()
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

/// A checkout in progress against the in-memory tables.
struct MemoryCheckout {
    guard: OwnedMutexGuard<Tables>,
    work: Tables,
}

#[async_trait]
impl CheckoutStore for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn CheckoutUnit>, RepositoryError> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryCheckout { guard, work }))
    }
}

#[async_trait]
impl CheckoutUnit for MemoryCheckout {
    async fn lock_cart(&mut self, user: UserId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self.work.cart_for_user(user).cloned())
    }

    async fn reserve_stock(
        &mut self,
        product: ProductId,
        quantity: Quantity,
    ) -> Result<Reservation, RepositoryError> {
        let Some(found) = self.work.products.get_mut(&product) else {
            return Ok(Reservation::Missing);
        };
        Ok(match found.stock.take(quantity) {
            Some(left) => {
                found.stock = left;
                found.updated_at = Utc::now();
                Reservation::Reserved(found.clone())
            }
            None => Reservation::Insufficient,
        })
    }

    async fn retain_cart_items(
        &mut self,
        cart: CartId,
        keep: &[CartItem],
    ) -> Result<(), RepositoryError> {
        let cart = self.work.cart_mut(cart)?;
        cart.items.retain(|item| keep.iter().any(|k| k.id == item.id));
        cart.updated_at = Utc::now();
        Ok(())
    }

    async fn insert_receipt(&mut self, new: &NewReceipt) -> Result<Receipt, RepositoryError> {
        if self.work.receipts.values().any(|r| r.code == new.code) {
            return Err(RepositoryError::Conflict("receipt code already exists".to_owned()));
        }
        let receipt = Receipt {
            id: ReceiptId::new(next(&mut self.work.seq.receipt)),
            code: new.code.clone(),
            amount: new.amount,
            purchaser: new.purchaser.clone(),
            purchaser_id: Some(new.purchaser_id),
            lines: new.lines.clone(),
            created_at: new.created_at,
        };
        self.work.receipts.insert(receipt.id, receipt.clone());
        Ok(receipt)
    }

    async fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let Self { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}

#[async_trait]
impl HealthCheck for MemoryStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use riffhouse_core::{AuthProvider, Price};
    use rust_decimal::Decimal;

    use super::*;

    fn guitar(code: &str, category: &str, price: i64, stock: i64) -> NewProduct {
        NewProduct {
            title: format!("Guitar {code}"),
            description: "Solid body".to_string(),
            price: Price::new(Decimal::new(price, 0)).unwrap(),
            stock: Stock::new(stock).unwrap(),
            category: category.to_string(),
            brand: "Fender".to_string(),
            model: code.to_string(),
            code: code.to_string(),
            image_url: "https://img.example/g.jpg".to_string(),
            status: ProductStatus::Active,
        }
    }

    fn shopper(email: &str) -> NewUser {
        NewUser {
            first_name: "Ana".to_string(),
            last_name: "Vidović".to_string(),
            email: Email::parse(email).unwrap(),
            age: Some(30),
            password_hash: None,
            role: UserRole::User,
            provider: AuthProvider::Local,
        }
    }

    #[tokio::test]
    async fn test_duplicate_product_code_conflicts() {
        let store = MemoryStore::new();
        ProductRepository::create(&store, &guitar("STRAT", "electric", 1000, 1))
            .await
            .unwrap();
        let err = ProductRepository::create(&store, &guitar("STRAT", "electric", 1000, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_list_filters_sorts_and_pages() {
        let store = MemoryStore::new();
        for (code, category, price) in [
            ("A", "electric", 900),
            ("B", "acoustic", 500),
            ("C", "electric", 300),
            ("D", "electric", 1200),
        ] {
            ProductRepository::create(&store, &guitar(code, category, price, 1))
                .await
                .unwrap();
        }

        let query = ProductQuery::new(
            Some("electric".to_string()),
            ProductSort::PriceAsc,
            Some(1),
            Some(2),
        );
        let page = ProductRepository::list(&store, &query).await.unwrap();
        assert_eq!(page.total, 3);
        let codes: Vec<_> = page.products.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, ["C", "A"]);

        let query = ProductQuery { page: 2, ..query };
        let page = ProductRepository::list(&store, &query).await.unwrap();
        let codes: Vec<_> = page.products.iter().map(|p| p.code.as_str()).collect();
        assert_eq!(codes, ["D"]);
    }

    #[tokio::test]
    async fn test_categories_are_distinct_and_sorted() {
        let store = MemoryStore::new();
        for (code, category) in [("A", "electric"), ("B", "acoustic"), ("C", "electric")] {
            ProductRepository::create(&store, &guitar(code, category, 1, 1))
                .await
                .unwrap();
        }
        assert_eq!(store.categories().await.unwrap(), ["acoustic", "electric"]);
    }

    #[tokio::test]
    async fn test_add_item_merges_same_product() {
        let store = MemoryStore::new();
        let product = ProductRepository::create(&store, &guitar("A", "electric", 1, 5))
            .await
            .unwrap();
        let cart = store.get_or_create(UserId::new(1)).await.unwrap();

        store
            .add_item(cart.id, product.id, Quantity::new(2).unwrap())
            .await
            .unwrap();
        let cart = store
            .add_item(cart.id, product.id, Quantity::new(3).unwrap())
            .await
            .unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, 5);
    }

    #[tokio::test]
    async fn test_add_item_merge_stops_at_max_quantity() {
        let store = MemoryStore::new();
        let product = ProductRepository::create(&store, &guitar("A", "electric", 1, 5))
            .await
            .unwrap();
        let cart = store.get_or_create(UserId::new(1)).await.unwrap();
        let most = Quantity::new(i64::from(i32::MAX) - 1).unwrap();

        store.add_item(cart.id, product.id, most).await.unwrap();
        let cart = store
            .add_item(cart.id, product.id, Quantity::new(5).unwrap())
            .await
            .unwrap();

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].quantity, i32::MAX);
    }

    #[tokio::test]
    async fn test_remove_unknown_item_is_not_found() {
        let store = MemoryStore::new();
        let cart = store.get_or_create(UserId::new(1)).await.unwrap();
        let err = store
            .remove_item(cart.id, CartItemId::new(99))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_create_user_creates_cart_and_rejects_duplicate_email() {
        let store = MemoryStore::new();
        let user = UserRepository::create(&store, &shopper("ana@example.com"))
            .await
            .unwrap();
        assert_eq!(CartRepository::list(&store).await.unwrap().len(), 1);
        assert_eq!(
            store.get_or_create(user.id).await.unwrap().user_id,
            user.id
        );

        let err = UserRepository::create(&store, &shopper("ANA@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_dropped_checkout_unit_discards_writes() {
        let store = MemoryStore::new();
        let product = ProductRepository::create(&store, &guitar("A", "electric", 1, 5))
            .await
            .unwrap();

        {
            let mut unit = store.begin().await.unwrap();
            let outcome = unit
                .reserve_stock(product.id, Quantity::new(2).unwrap())
                .await
                .unwrap();
            assert!(matches!(outcome, Reservation::Reserved(p) if p.stock.get() == 3));
        }

        let stored = ProductRepository::get(&store, product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock.get(), 5);
    }

    #[tokio::test]
    async fn test_reserve_stock_outcomes() {
        let store = MemoryStore::new();
        let product = ProductRepository::create(&store, &guitar("A", "electric", 1, 1))
            .await
            .unwrap();
        let mut unit = store.begin().await.unwrap();

        let two = Quantity::new(2).unwrap();
        assert_eq!(
            unit.reserve_stock(product.id, two).await.unwrap(),
            Reservation::Insufficient
        );
        assert_eq!(
            unit.reserve_stock(ProductId::new(404), two).await.unwrap(),
            Reservation::Missing
        );
        unit.commit().await.unwrap();

        let stored = ProductRepository::get(&store, product.id).await.unwrap().unwrap();
        assert_eq!(stored.stock.get(), 1);
    }
}
