use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::{render_template, Flashes, InvoiceTemplate, PackingSlipTemplate, PageContext};
use crate::api::AppError;
use crate::db::{ensure_invoice, load_order_detail, Invoice, OrderDetail, User};
use crate::invoice::{
    amount_in_words, invoice_file_name, invoice_layout, packing_slip_file_name, packing_slip_layout,
    render_pdf, PageLayout, SlipContent,
};
use crate::AppState;

async fn order_detail(state: &AppState, id: &str) -> Result<OrderDetail, AppError> {
    load_order_detail(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Order not found"))
}

/// Load an order, allocating its invoice number if it has none yet
async fn invoiced_order(state: &AppState, id: &str) -> Result<(OrderDetail, Invoice), AppError> {
    let mut detail = order_detail(state, id).await?;

    let invoice = match &detail.invoice {
        Some(invoice) => invoice.clone(),
        None => {
            let mut tx = state.db.begin().await?;
            let invoice = ensure_invoice(&mut tx, id).await?;
            tx.commit().await?;
            tracing::info!(order_id = %id, invoice = %invoice.invoice_number, "Invoice number allocated");
            detail.invoice = Some(invoice.clone());
            invoice
        }
    };

    Ok((detail, invoice))
}

async fn pdf_response(layout: PageLayout, file_name: String) -> Result<Response, AppError> {
    let bytes = tokio::task::spawn_blocking(move || render_pdf(&layout))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "PDF task failed");
            AppError::internal("Failed to generate PDF")
        })??;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", file_name),
            ),
        ],
        bytes,
    )
        .into_response())
}

pub async fn invoice_page(
    State(state): State<Arc<AppState>>,
    user: User,
    flashes: Flashes,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let (detail, invoice) = invoiced_order(&state, &id).await?;

    Ok(render_template(InvoiceTemplate {
        page: PageContext::new(&state, user, flashes),
        amount_words: amount_in_words(detail.order.total_amount),
        business: state.config.business.clone(),
        detail,
        invoice,
    }))
}

pub async fn invoice_download(
    State(state): State<Arc<AppState>>,
    _user: User,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let (detail, invoice) = invoiced_order(&state, &id).await?;
    let layout = invoice_layout(&detail, &invoice, &state.config.business);
    pdf_response(layout, invoice_file_name(&invoice)).await
}

pub async fn packing_slip_page(
    State(state): State<Arc<AppState>>,
    user: User,
    flashes: Flashes,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let detail = order_detail(&state, &id).await?;

    Ok(render_template(PackingSlipTemplate {
        page: PageContext::new(&state, user, flashes),
        slip: SlipContent::from_detail(&detail),
        detail,
    }))
}

pub async fn packing_slip_download(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let detail = order_detail(&state, &id).await?;
    let layout = packing_slip_layout(&detail, &state.config.business);
    pdf_response(layout, packing_slip_file_name(&detail)).await
}
