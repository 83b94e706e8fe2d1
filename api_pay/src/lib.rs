use actix_web::web::{self};

pub mod routes {
    pub mod pay;
}

pub mod services {
    pub(crate) mod reconcile;

    pub mod invoice;
    pub mod status;
    pub mod webhook;
}

pub mod dtos {
    pub mod pay;
}

pub mod misc {
    pub mod gateway_status;
    pub mod signature;
}

/// Routes that act on behalf of a signed-in user. Must be wrapped in the auth guard.
pub fn mount_pay() -> actix_web::Scope {
    web::scope("")
        .service(routes::pay::post_create_invoice)
        .service(routes::pay::get_status)
        .service(routes::pay::get_payments)
}

/// Gateway callback. Authenticated by signature, not by session.
pub fn mount_webhook() -> actix_web::Scope {
    web::scope("/webhook").service(routes::pay::post_webhook)
}
