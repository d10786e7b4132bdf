//! In-memory store for tests and local development.
//!
//! One mutex guards all state, which makes every operation trivially
//! atomic - the same guarantee the Postgres implementation gets from
//! row locks and transactions.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pomelo_core::{CartId, CartLineId, OrderId, OrderItemId, PaymentId, ProductId, UserId, VariantKey};

use crate::models::{
    AddLine, Cart, CartLine, NewProduct, Order, OrderDraft, OrderItem, Payment, PaymentDraft,
    PlacedOrder, Product, StockLevel, cart,
};

use super::{CartStore, CatalogStore, OrderStore, PaymentStore, StoreError};

#[derive(Default)]
struct Inner {
    products: HashMap<ProductId, Product>,
    carts: HashMap<UserId, Cart>,
    orders: HashMap<OrderId, Order>,
    payments: HashMap<OrderId, Payment>,
    next_id: i32,
}

impl Inner {
    fn next(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Mutex-guarded store implementing every persistence trait.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn get(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        Ok(self.lock().products.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let inner = self.lock();
        let mut products: Vec<Product> = inner.products.values().cloned().collect();
        products.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(products)
    }

    async fn insert(&self, new: NewProduct) -> Result<Product, StoreError> {
        let mut inner = self.lock();
        let id = ProductId::new(inner.next());
        let now = Utc::now();
        let product = Product {
            id,
            name: new.name,
            price: new.price,
            discount_percent: new.discount_percent,
            stock: new.stock,
            sizes: new.sizes,
            colors: new.colors,
            images: new.images,
            created_at: now,
            updated_at: now,
        };
        inner.products.insert(id, product.clone());
        Ok(product)
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn get(&self, user: UserId) -> Result<Option<Cart>, StoreError> {
        Ok(self.lock().carts.get(&user).cloned())
    }

    async fn add_line(&self, user: UserId, req: AddLine) -> Result<Cart, StoreError> {
        let mut inner = self.lock();

        let product = inner
            .products
            .get(&req.product_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("product {}", req.product_id)))?;

        let now = Utc::now();
        let key = VariantKey::new(req.product_id, req.color, req.size);

        // Existing line for this variant key merges; anything else
        // appends a fresh line with a price snapshot. Validation runs
        // before the lazy cart creation so a rejected add leaves no
        // empty cart behind.
        let existing_quantity = inner
            .carts
            .get(&user)
            .and_then(|c| c.lines.iter().find(|l| l.key == key))
            .map(|l| l.quantity);

        match existing_quantity {
            Some(in_cart) => {
                let merged = cart::merged_quantity(in_cart, req.quantity, product.stock)?;
                let cart = inner
                    .carts
                    .get_mut(&user)
                    .ok_or_else(|| StoreError::DataCorruption("cart vanished".to_owned()))?;
                if let Some(line) = cart.lines.iter_mut().find(|l| l.key == key) {
                    line.quantity = merged;
                }
                cart.updated_at = now;
            }
            None => {
                let (unit_price, discount_percent) = cart::fresh_line_snapshot(&product, req)?;
                let line_id = CartLineId::new(inner.next());
                if !inner.carts.contains_key(&user) {
                    let id = CartId::new(inner.next());
                    inner.carts.insert(
                        user,
                        Cart {
                            id,
                            user_id: user,
                            lines: Vec::new(),
                            created_at: now,
                            updated_at: now,
                        },
                    );
                }
                let cart = inner
                    .carts
                    .get_mut(&user)
                    .ok_or_else(|| StoreError::DataCorruption("cart vanished".to_owned()))?;
                cart.lines.push(CartLine {
                    id: line_id,
                    cart_id: cart.id,
                    key,
                    quantity: req.quantity,
                    unit_price,
                    discount_percent,
                    added_at: now,
                });
                cart.updated_at = now;
            }
        }

        inner
            .carts
            .get(&user)
            .cloned()
            .ok_or_else(|| StoreError::DataCorruption("cart vanished".to_owned()))
    }

    async fn remove_line(
        &self,
        user: UserId,
        line: CartLineId,
    ) -> Result<Option<Cart>, StoreError> {
        let mut inner = self.lock();

        let cart = inner
            .carts
            .get_mut(&user)
            .ok_or_else(|| StoreError::NotFound("cart".to_owned()))?;

        let before = cart.lines.len();
        cart.lines.retain(|l| l.id != line);
        if cart.lines.len() == before {
            return Err(StoreError::NotFound(format!("cart line {line}")));
        }
        cart.updated_at = Utc::now();

        if cart.lines.is_empty() {
            inner.carts.remove(&user);
            return Ok(None);
        }
        Ok(inner.carts.get(&user).cloned())
    }

    async fn clear(&self, user: UserId) -> Result<(), StoreError> {
        self.lock().carts.remove(&user);
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create(&self, draft: OrderDraft) -> Result<PlacedOrder, StoreError> {
        let mut inner = self.lock();

        // Idempotent replay: same key returns the stored order and
        // touches nothing.
        if let Some(key) = draft.idempotency_key.as_deref()
            && let Some(existing) = inner
                .orders
                .values()
                .find(|o| o.idempotency_key.as_deref() == Some(key))
                .cloned()
        {
            let payment = inner.payments.get(&existing.id).cloned().ok_or_else(|| {
                StoreError::DataCorruption(format!("order {} has no payment", existing.id))
            })?;
            return Ok(PlacedOrder {
                order: existing,
                payment,
                stock_after: Vec::new(),
                replayed: true,
            });
        }

        // Verify all product refs before mutating anything, so a bad
        // draft cannot leave a partial decrement.
        for item in &draft.items {
            if !inner.products.contains_key(&item.product_id) {
                return Err(StoreError::NotFound(format!("product {}", item.product_id)));
            }
        }

        let now = Utc::now();
        let order_id = OrderId::new(inner.next());

        let mut items = Vec::with_capacity(draft.items.len());
        let mut stock_after = Vec::with_capacity(draft.items.len());
        for item in &draft.items {
            let item_id = OrderItemId::new(inner.next());
            items.push(OrderItem {
                id: item_id,
                product_id: item.product_id,
                name: item.name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                image: item.image.clone(),
            });
            if let Some(product) = inner.products.get_mut(&item.product_id) {
                product.stock = (product.stock - item.quantity).max(0);
                product.updated_at = now;
                stock_after.push(StockLevel {
                    product_id: product.id,
                    name: product.name.clone(),
                    stock: product.stock,
                });
            }
        }

        let order = Order {
            id: order_id,
            user_id: draft.user_id,
            items,
            shipping_address: draft.shipping_address,
            payment_method: draft.payment_method.clone(),
            items_price: draft.items_price,
            tax_price: draft.tax_price,
            shipping_price: draft.shipping_price,
            total_price: draft.total_price,
            is_paid: false,
            paid_at: None,
            is_delivered: false,
            delivered_at: None,
            idempotency_key: draft.idempotency_key,
            created_at: now,
        };

        let payment_id = PaymentId::new(inner.next());
        let payment = Payment {
            id: payment_id,
            order_id,
            method: draft.payment.method,
            provider_ref: draft.payment.provider_ref,
            provider_status: draft.payment.provider_status,
            card_brand: draft.payment.card_brand,
            card_last4: draft.payment.card_last4,
            amount: draft.payment.amount,
            is_paid: draft.payment.paid,
            paid_at: draft.payment.paid.then_some(now),
            created_at: now,
        };

        inner.orders.insert(order_id, order.clone());
        inner.payments.insert(order_id, payment.clone());

        Ok(PlacedOrder {
            order,
            payment,
            stock_after,
            replayed: false,
        })
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        Ok(self.lock().orders.get(&id).cloned())
    }

    async fn list_by_user(&self, user: UserId) -> Result<Vec<Order>, StoreError> {
        let inner = self.lock();
        let mut orders: Vec<Order> = inner
            .orders
            .values()
            .filter(|o| o.user_id == user)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(orders)
    }

    async fn list_all(&self) -> Result<Vec<Order>, StoreError> {
        let inner = self.lock();
        let mut orders: Vec<Order> = inner.orders.values().cloned().collect();
        orders.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(orders)
    }

    async fn mark_paid(&self, id: OrderId, at: DateTime<Utc>) -> Result<Order, StoreError> {
        let mut inner = self.lock();
        let order = inner
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("order {id}")))?;
        if order.is_paid {
            return Err(StoreError::AlreadyPaid(id));
        }
        order.is_paid = true;
        order.paid_at = Some(at);
        Ok(order.clone())
    }

    async fn mark_delivered(&self, id: OrderId, at: DateTime<Utc>) -> Result<Order, StoreError> {
        let mut inner = self.lock();
        let order = inner
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(format!("order {id}")))?;
        if order.is_delivered {
            return Err(StoreError::AlreadyDelivered(id));
        }
        order.is_delivered = true;
        order.delivered_at = Some(at);
        Ok(order.clone())
    }

    async fn delete(&self, id: OrderId) -> Result<(), StoreError> {
        let mut inner = self.lock();
        inner
            .orders
            .remove(&id)
            .ok_or_else(|| StoreError::NotFound(format!("order {id}")))?;
        inner.payments.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn record(&self, order: OrderId, draft: PaymentDraft) -> Result<Payment, StoreError> {
        let mut inner = self.lock();
        if !inner.orders.contains_key(&order) {
            return Err(StoreError::NotFound(format!("order {order}")));
        }
        if inner.payments.contains_key(&order) {
            return Err(StoreError::Conflict(format!(
                "order {order} already has a payment"
            )));
        }

        let now = Utc::now();
        let payment = Payment {
            id: PaymentId::new(inner.next()),
            order_id: order,
            method: draft.method,
            provider_ref: draft.provider_ref,
            provider_status: draft.provider_status,
            card_brand: draft.card_brand,
            card_last4: draft.card_last4,
            amount: draft.amount,
            is_paid: draft.paid,
            paid_at: draft.paid.then_some(now),
            created_at: now,
        };
        inner.payments.insert(order, payment.clone());
        Ok(payment)
    }

    async fn get_by_order(&self, order: OrderId) -> Result<Option<Payment>, StoreError> {
        Ok(self.lock().payments.get(&order).cloned())
    }
}
