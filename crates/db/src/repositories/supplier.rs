use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row};

use cotar_core::domain::registration::{AccountType, PayoutMethod, RegistrationForm};
use cotar_core::domain::supplier::{Supplier, SupplierId};

use super::{encode_timestamp, RepositoryError};
use crate::DbPool;

/// Fully validated registration ready for persistence. Name and email come
/// from the invitation context, the rest from the wizard form.
pub struct NewSupplier {
    pub id: SupplierId,
    pub name: String,
    pub email: String,
    pub form: RegistrationForm,
}

pub struct SqlSupplierRepository {
    pool: DbPool,
}

impl SqlSupplierRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, supplier: NewSupplier) -> Result<(), RepositoryError> {
        let form = &supplier.form;
        let pix_key_type = form.pix_key_type().map(|kind| kind.as_str().to_string());

        sqlx::query(
            "INSERT INTO supplier (
                id, name, email,
                document_type, document_number, whatsapp, phone,
                cep, street, street_number, complement, neighborhood, city, state,
                specialties, website, description,
                payment_method, pix_key, pix_key_type,
                bank_code, agency, agency_digit, account_number, account_digit,
                account_type, account_holder_name, account_holder_document,
                created_at
             ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&supplier.id.0)
        .bind(&supplier.name)
        .bind(&supplier.email)
        .bind(form.document_type.map(|doc_type| doc_type.as_str().to_string()))
        .bind(&form.document_number)
        .bind(&form.whatsapp)
        .bind(Option::<String>::None)
        .bind(&form.cep)
        .bind(&form.street)
        .bind(&form.number)
        .bind(&form.complement)
        .bind(&form.neighborhood)
        .bind(&form.city)
        .bind(&form.state)
        .bind(form.specialties.join(","))
        .bind(&form.website)
        .bind(&form.description)
        .bind(form.payment_method.map(payment_method_str))
        .bind(&form.pix_key)
        .bind(pix_key_type)
        .bind(&form.bank_code)
        .bind(&form.agency)
        .bind(&form.agency_digit)
        .bind(&form.account_number)
        .bind(&form.account_digit)
        .bind(form.account_type.map(account_type_str))
        .bind(&form.account_holder_name)
        .bind(&form.account_holder_document)
        .bind(encode_timestamp(Utc::now()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_id(&self, id: &SupplierId) -> Result<Option<Supplier>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, email, document_type, document_number, whatsapp, phone, city, state
             FROM supplier
             WHERE id = ?",
        )
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(supplier_from_row))
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<Supplier>, RepositoryError> {
        let row = sqlx::query(
            "SELECT id, name, email, document_type, document_number, whatsapp, phone, city, state
             FROM supplier
             WHERE email = ?
             ORDER BY created_at DESC
             LIMIT 1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(supplier_from_row))
    }
}

fn supplier_from_row(row: SqliteRow) -> Supplier {
    let cnpj = match row.get::<Option<String>, _>("document_type").as_deref() {
        Some("cnpj") => row.get::<Option<String>, _>("document_number"),
        _ => None,
    };

    Supplier {
        id: SupplierId(row.get("id")),
        name: row.get("name"),
        email: row.get("email"),
        cnpj,
        phone: row
            .get::<Option<String>, _>("whatsapp")
            .or_else(|| row.get::<Option<String>, _>("phone")),
        city: row.get("city"),
        state: row.get("state"),
    }
}

fn payment_method_str(method: PayoutMethod) -> &'static str {
    match method {
        PayoutMethod::Pix => "pix",
        PayoutMethod::BankAccount => "bank_account",
    }
}

fn account_type_str(account_type: AccountType) -> &'static str {
    match account_type {
        AccountType::Corrente => "corrente",
        AccountType::Poupanca => "poupanca",
    }
}
