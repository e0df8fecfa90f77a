use std::collections::HashMap;

use thiserror::Error;
use validator::Validate;

use quickbite_core::Storage;

use crate::{
    Api, ApiError, CartState, DeliveryAddress, NewOrder, NewOrderLine, OrderData, PaymentMethod,
};

#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The delivery details are incomplete or malformed. Nothing was sent.
    #[error("invalid delivery details")]
    InvalidAddress(HashMap<String, String>),
    /// There is nothing in the cart to order
    #[error("the cart is empty")]
    EmptyCart,
    /// Order creation failed remotely. The cart is left exactly as it was.
    #[error(transparent)]
    Api(#[from] ApiError),
}

/// Creates an order from the current cart, clearing the cart once the remote
/// call succeeds.
///
/// The address is validated before anything leaves the client, and a failed
/// remote call leaves the cart untouched.
pub async fn place_order<S, A>(
    api: &A,
    cart: &CartState<S>,
    address: DeliveryAddress,
    payment_method: PaymentMethod,
) -> Result<OrderData, CheckoutError>
where
    S: Storage,
    A: Api,
{
    if let Err(errors) = address.validate() {
        return Err(CheckoutError::InvalidAddress(flatten_errors(errors)));
    }

    let snapshot = cart.snapshot();

    let vendor = snapshot.vendor.ok_or(CheckoutError::EmptyCart)?;
    let lines = snapshot
        .lines
        .iter()
        .map(|line| NewOrderLine {
            item_id: line.item_id,
            quantity: line.quantity,
        })
        .collect();

    let order = api
        .create_order(NewOrder {
            vendor_id: vendor.vendor_id,
            lines,
            delivery_address: address,
            payment_method,
        })
        .await?;

    cart.clear();

    Ok(order)
}

fn flatten_errors(errors: validator::ValidationErrors) -> HashMap<String, String> {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errors)| {
            let message = errors
                .iter()
                .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| "invalid value".to_string());

            (field.to_string(), message)
        })
        .collect()
}
