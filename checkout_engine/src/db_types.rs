use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use shop_common::Money;
use sqlx::{sqlite::SqliteRow, FromRow, Row, Type};
use thiserror::Error;

/// Carts are reclaimed after this much inactivity.
pub const CART_EXPIRY_DAYS: i64 = 30;

#[derive(Debug, Clone, Error)]
#[error("Invalid value: {0}")]
pub struct ConversionError(String);

//--------------------------------------      OwnerKind      ---------------------------------------------------------
/// Carts and orders are owned by exactly one identity: an end-user, or an employer buying on behalf of its staff.
/// The two are mutually exclusive, so the owner is carried as an explicit tagged pair rather than a field name
/// computed at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnerKind {
    User,
    Employer,
}

impl Display for OwnerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OwnerKind::User => write!(f, "User"),
            OwnerKind::Employer => write!(f, "Employer"),
        }
    }
}

impl FromStr for OwnerKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "User" | "user" => Ok(Self::User),
            "Employer" | "employer" => Ok(Self::Employer),
            s => Err(ConversionError(format!("Invalid owner kind: {s}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Owner {
    pub kind: OwnerKind,
    pub id: String,
}

impl Owner {
    pub fn user<S: Into<String>>(id: S) -> Self {
        Self { kind: OwnerKind::User, id: id.into() }
    }

    pub fn employer<S: Into<String>>(id: S) -> Self {
        Self { kind: OwnerKind::Employer, id: id.into() }
    }
}

impl Display for Owner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

//--------------------------------------    GatewayOrderId    --------------------------------------------------------
/// The order identifier assigned by the payment gateway when an intent is created. The payment audit ledger is
/// keyed by this value, so a payment record stays reconcilable even if the matching order write failed.
#[derive(Debug, Clone, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct GatewayOrderId(pub String);

impl FromStr for GatewayOrderId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for GatewayOrderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl Display for GatewayOrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl GatewayOrderId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------     OrderStatus      --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// The order has been created and is awaiting gateway completion.
    Pending,
    /// Payment has been verified; the order is confirmed.
    Confirmed,
    /// The order is being prepared for shipment.
    Processing,
    Shipped,
    Delivered,
    /// The order was cancelled before shipping. Cancellation is a status transition, never a deletion.
    Cancelled,
    Refunded,
    PartiallyRefunded,
}

impl OrderStatus {
    /// The order status state machine. `Pending → Confirmed → Processing → Shipped → Delivered`, with cancellation
    /// as a side branch from the two earliest states and refunds only after delivery.
    pub fn can_transition_to(self, new: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, new),
            (Pending, Confirmed) |
                (Confirmed, Processing) |
                (Processing, Shipped) |
                (Shipped, Delivered) |
                (Pending, Cancelled) |
                (Confirmed, Cancelled) |
                (Delivered, Refunded) |
                (Delivered, PartiallyRefunded) |
                (PartiallyRefunded, Refunded)
        )
    }

    /// `Pending` and `Confirmed` are the only cancellable states.
    pub fn is_cancellable(self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Confirmed)
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "Pending"),
            OrderStatus::Confirmed => write!(f, "Confirmed"),
            OrderStatus::Processing => write!(f, "Processing"),
            OrderStatus::Shipped => write!(f, "Shipped"),
            OrderStatus::Delivered => write!(f, "Delivered"),
            OrderStatus::Cancelled => write!(f, "Cancelled"),
            OrderStatus::Refunded => write!(f, "Refunded"),
            OrderStatus::PartiallyRefunded => write!(f, "PartiallyRefunded"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Confirmed" => Ok(Self::Confirmed),
            "Processing" => Ok(Self::Processing),
            "Shipped" => Ok(Self::Shipped),
            "Delivered" => Ok(Self::Delivered),
            "Cancelled" => Ok(Self::Cancelled),
            "Refunded" => Ok(Self::Refunded),
            "PartiallyRefunded" => Ok(Self::PartiallyRefunded),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

//--------------------------------------    PaymentStatus     --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "Pending"),
            PaymentStatus::Paid => write!(f, "Paid"),
            PaymentStatus::Failed => write!(f, "Failed"),
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(Self::Pending),
            "Paid" => Ok(Self::Paid),
            "Failed" => Ok(Self::Failed),
            s => Err(ConversionError(format!("Invalid payment status: {s}"))),
        }
    }
}

//--------------------------------------     AuditStatus      --------------------------------------------------------
/// Status of a [`PaymentAudit`] ledger entry. `Initiated → Success | Failed`, plus `Refunded` after the money went
/// back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Initiated,
    Success,
    Failed,
    Refunded,
}

impl Display for AuditStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditStatus::Initiated => write!(f, "Initiated"),
            AuditStatus::Success => write!(f, "Success"),
            AuditStatus::Failed => write!(f, "Failed"),
            AuditStatus::Refunded => write!(f, "Refunded"),
        }
    }
}

//--------------------------------------     RefundStatus     --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    Pending,
    Partial,
    Completed,
}

impl Display for RefundStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefundStatus::Pending => write!(f, "Pending"),
            RefundStatus::Partial => write!(f, "Partial"),
            RefundStatus::Completed => write!(f, "Completed"),
        }
    }
}

//--------------------------------------     DiscountKind     --------------------------------------------------------
/// Discriminates percentage discounts from fixed amounts, for both product discount rules and cart coupons.
/// Percentage values are whole percentage points; fixed values are minor currency units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    Percent,
    Fixed,
}

impl Display for DiscountKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscountKind::Percent => write!(f, "Percent"),
            DiscountKind::Fixed => write!(f, "Fixed"),
        }
    }
}

impl FromStr for DiscountKind {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Percent" | "percent" => Ok(Self::Percent),
            "Fixed" | "fixed" => Ok(Self::Fixed),
            s => Err(ConversionError(format!("Invalid discount kind: {s}"))),
        }
    }
}

//--------------------------------------    ShippingMethod    --------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod {
    Standard,
    Express,
    Pickup,
}

impl Display for ShippingMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShippingMethod::Standard => write!(f, "Standard"),
            ShippingMethod::Express => write!(f, "Express"),
            ShippingMethod::Pickup => write!(f, "Pickup"),
        }
    }
}

impl FromStr for ShippingMethod {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Standard" | "standard" => Ok(Self::Standard),
            "Express" | "express" => Ok(Self::Express),
            "Pickup" | "pickup" => Ok(Self::Pickup),
            s => Err(ConversionError(format!("Invalid shipping method: {s}"))),
        }
    }
}

//--------------------------------------       Address        --------------------------------------------------------
/// A billing or shipping address, snapshotted onto the order as JSON at checkout time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    pub postcode: String,
    pub country: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

impl Address {
    /// Returns the name of the first required field that is blank, if any.
    pub fn first_missing_field(&self) -> Option<&'static str> {
        let required = [
            ("name", self.name.as_str()),
            ("line1", self.line1.as_str()),
            ("city", self.city.as_str()),
            ("postcode", self.postcode.as_str()),
            ("country", self.country.as_str()),
        ];
        required.into_iter().find(|(_, v)| v.trim().is_empty()).map(|(f, _)| f)
    }
}

//--------------------------------------       Product        --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Product {
    pub id: i64,
    pub title: String,
    pub price: Money,
    pub discount_kind: Option<DiscountKind>,
    pub discount_value: Option<i64>,
    pub discount_valid_from: Option<DateTime<Utc>>,
    pub discount_valid_until: Option<DateTime<Utc>>,
    pub stock: i64,
    /// Non-physical goods carry unlimited stock; availability then ignores the stock counter.
    pub unlimited: bool,
    pub sales: i64,
    pub active: bool,
    pub visible: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Availability is a pure function of the product's flags and stock; it is never stored separately.
    pub fn is_available(&self) -> bool {
        self.active && self.visible && self.deleted_at.is_none() && (self.unlimited || self.stock > 0)
    }

    /// The price after applying the product's own discount rule, if one is in effect at `now`.
    pub fn effective_price(&self, now: DateTime<Utc>) -> Money {
        let (kind, value) = match (self.discount_kind, self.discount_value) {
            (Some(kind), Some(value)) => (kind, value),
            _ => return self.price,
        };
        if let Some(from) = self.discount_valid_from {
            if now < from {
                return self.price;
            }
        }
        if let Some(until) = self.discount_valid_until {
            if now > until {
                return self.price;
            }
        }
        match kind {
            DiscountKind::Percent => {
                #[allow(clippy::cast_sign_loss)]
                let bp = (value.clamp(0, 100) as u32) * 100;
                self.price.saturating_sub(self.price.scale_bp(bp))
            },
            DiscountKind::Fixed => self.price.saturating_sub(Money::from(value)),
        }
    }

    /// How many units can still be sold. `None` means unlimited.
    pub fn available_stock(&self) -> Option<i64> {
        if self.unlimited {
            None
        } else {
            Some(self.stock)
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub price: Money,
    pub discount_kind: Option<DiscountKind>,
    pub discount_value: Option<i64>,
    pub discount_valid_from: Option<DateTime<Utc>>,
    pub discount_valid_until: Option<DateTime<Utc>>,
    pub stock: i64,
    pub unlimited: bool,
}

impl NewProduct {
    pub fn new<S: Into<String>>(title: S, price: Money, stock: i64) -> Self {
        Self {
            title: title.into(),
            price,
            discount_kind: None,
            discount_value: None,
            discount_valid_from: None,
            discount_valid_until: None,
            stock,
            unlimited: false,
        }
    }

    pub fn unlimited<S: Into<String>>(title: S, price: Money) -> Self {
        Self { stock: 0, unlimited: true, ..Self::new(title, price, 0) }
    }

    pub fn with_discount(mut self, kind: DiscountKind, value: i64) -> Self {
        self.discount_kind = Some(kind);
        self.discount_value = Some(value);
        self
    }
}

//--------------------------------------      Cart item       --------------------------------------------------------
/// A cart line. Prices and title are snapshots taken at mutation time; checkout re-verifies against the live
/// product record before any money moves.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CartItem {
    pub id: i64,
    pub cart_id: i64,
    pub product_id: i64,
    pub title: String,
    pub unit_price: Money,
    pub discounted_price: Money,
    pub quantity: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CartItem {
    pub fn effective_price(&self) -> Money {
        self.discounted_price
    }

    pub fn line_total(&self) -> Money {
        self.discounted_price * self.quantity
    }
}

//--------------------------------------       Coupon         --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Coupon {
    pub id: i64,
    pub cart_id: i64,
    pub code: String,
    pub kind: DiscountKind,
    pub value: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCoupon {
    pub code: String,
    pub kind: DiscountKind,
    /// Percentage points for [`DiscountKind::Percent`], minor currency units for [`DiscountKind::Fixed`].
    pub value: i64,
}

//--------------------------------------        Cart          --------------------------------------------------------
/// A mutable pre-purchase collection of line items with derived totals. Exactly one active cart exists per owner;
/// completed checkouts deactivate the cart rather than deleting it.
#[derive(Debug, Clone, Serialize)]
pub struct Cart {
    pub id: i64,
    pub owner: Owner,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub shipping_method: ShippingMethod,
    pub shipping_cost: Money,
    pub total: Money,
    pub is_active: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<CartItem>,
    pub coupons: Vec<Coupon>,
}

impl FromRow<'_, SqliteRow> for Cart {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner: Owner { kind: row.try_get("owner_kind")?, id: row.try_get("owner_id")? },
            subtotal: row.try_get("subtotal")?,
            discount: row.try_get("discount")?,
            tax: row.try_get("tax")?,
            shipping_method: row.try_get("shipping_method")?,
            shipping_cost: row.try_get("shipping_cost")?,
            total: row.try_get("total")?,
            is_active: row.try_get("is_active")?,
            expires_at: row.try_get("expires_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            items: Vec::new(),
            coupons: Vec::new(),
        })
    }
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_for_product(&self, product_id: i64) -> Option<&CartItem> {
        self.items.iter().find(|i| i.product_id == product_id)
    }

    pub fn expiry_from(now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::days(CART_EXPIRY_DAYS)
    }
}

//--------------------------------------     Order item       --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub title: String,
    pub unit_price: Money,
    pub discounted_price: Money,
    pub quantity: i64,
    pub line_total: Money,
}

#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: i64,
    pub title: String,
    pub unit_price: Money,
    pub discounted_price: Money,
    pub quantity: i64,
}

impl NewOrderItem {
    pub fn line_total(&self) -> Money {
        self.discounted_price * self.quantity
    }
}

//--------------------------------------    Payment info      --------------------------------------------------------
/// The payment record nested in an order. The gateway payment id and signature are only present once the payment
/// has been verified.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentInfo {
    pub gateway: String,
    pub gateway_order_id: GatewayOrderId,
    pub gateway_payment_id: Option<String>,
    pub signature: Option<String>,
    pub status: PaymentStatus,
    pub paid_at: Option<DateTime<Utc>>,
}

//--------------------------------------        Order         --------------------------------------------------------
/// An immutable-at-creation snapshot of a completed checkout attempt. Post-creation, only the status machine,
/// payment info and cancellation/refund fields change; orders are never deleted.
#[derive(Debug, Clone, Serialize)]
pub struct Order {
    pub id: i64,
    pub owner: Owner,
    pub cart_id: Option<i64>,
    pub customer_name: String,
    pub customer_email: String,
    pub billing_address: Address,
    pub shipping_address: Address,
    pub notes: Option<String>,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub currency: String,
    pub status: OrderStatus,
    pub payment: PaymentInfo,
    pub cancel_reason: Option<String>,
    pub cancel_requested_at: Option<DateTime<Utc>>,
    pub cancellation_approved: bool,
    pub refund_status: Option<RefundStatus>,
    pub refunded_total: Money,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItem>,
}

fn address_column(row: &SqliteRow, column: &str) -> Result<Address, sqlx::Error> {
    let raw: String = row.try_get(column)?;
    serde_json::from_str(&raw)
        .map_err(|e| sqlx::Error::ColumnDecode { index: column.to_string(), source: Box::new(e) })
}

impl FromRow<'_, SqliteRow> for Order {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner: Owner { kind: row.try_get("owner_kind")?, id: row.try_get("owner_id")? },
            cart_id: row.try_get("cart_id")?,
            customer_name: row.try_get("customer_name")?,
            customer_email: row.try_get("customer_email")?,
            billing_address: address_column(row, "billing_address")?,
            shipping_address: address_column(row, "shipping_address")?,
            notes: row.try_get("notes")?,
            subtotal: row.try_get("subtotal")?,
            discount: row.try_get("discount")?,
            tax: row.try_get("tax")?,
            shipping_cost: row.try_get("shipping_cost")?,
            total: row.try_get("total")?,
            currency: row.try_get("currency")?,
            status: row.try_get("status")?,
            payment: PaymentInfo {
                gateway: row.try_get("gateway")?,
                gateway_order_id: row.try_get("gateway_order_id")?,
                gateway_payment_id: row.try_get("gateway_payment_id")?,
                signature: row.try_get("payment_signature")?,
                status: row.try_get("payment_status")?,
                paid_at: row.try_get("paid_at")?,
            },
            cancel_reason: row.try_get("cancel_reason")?,
            cancel_requested_at: row.try_get("cancel_requested_at")?,
            cancellation_approved: row.try_get("cancellation_approved")?,
            refund_status: row.try_get("refund_status")?,
            refunded_total: row.try_get("refunded_total")?,
            shipped_at: row.try_get("shipped_at")?,
            delivered_at: row.try_get("delivered_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            items: Vec::new(),
        })
    }
}

//--------------------------------------      New order       --------------------------------------------------------
/// The full snapshot the orchestrator persists when checkout succeeds. Totals are carried over from the cart's
/// derived aggregates; the customer and product fields are copies, not references, so the order survives later
/// catalog or profile changes.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub owner: Owner,
    pub cart_id: Option<i64>,
    pub customer_name: String,
    pub customer_email: String,
    pub billing_address: Address,
    pub shipping_address: Address,
    pub notes: Option<String>,
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub shipping_cost: Money,
    pub total: Money,
    pub currency: String,
    pub gateway: String,
    pub gateway_order_id: GatewayOrderId,
    pub items: Vec<NewOrderItem>,
}

//--------------------------------------   Timeline entry     --------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TimelineEntry {
    pub id: i64,
    pub order_id: i64,
    pub status: OrderStatus,
    pub note: String,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------    Payment audit     --------------------------------------------------------
/// An independent ledger record of a gateway interaction, keyed by the gateway's own order identifier and
/// deliberately decoupled from the orders table: payment history must survive an order-write failure.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentAudit {
    pub id: i64,
    pub gateway_order_id: GatewayOrderId,
    pub gateway: String,
    pub owner: Owner,
    pub amount: Money,
    pub currency: String,
    pub gateway_payment_id: Option<String>,
    pub status: AuditStatus,
    pub failure_reason: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FromRow<'_, SqliteRow> for PaymentAudit {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            gateway_order_id: row.try_get("gateway_order_id")?,
            gateway: row.try_get("gateway")?,
            owner: Owner { kind: row.try_get("owner_kind")?, id: row.try_get("owner_id")? },
            amount: row.try_get("amount")?,
            currency: row.try_get("currency")?,
            gateway_payment_id: row.try_get("gateway_payment_id")?,
            status: row.try_get("status")?,
            failure_reason: row.try_get("failure_reason")?,
            completed_at: row.try_get("completed_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewPaymentAudit {
    pub gateway_order_id: GatewayOrderId,
    pub gateway: String,
    pub owner: Owner,
    pub amount: Money,
    pub currency: String,
}

//--------------------------------------  Customer profile    --------------------------------------------------------
/// The authenticated identity driving a checkout, as resolved by the upstream auth collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub owner: Owner,
    pub name: String,
    pub email: String,
}
