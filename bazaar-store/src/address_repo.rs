use async_trait::async_trait;
use bazaar_core::repository::AddressRepository;
use bazaar_core::{AddressType, RepoError, UserAddress};
use bazaar_shared::Masked;
use sqlx::PgPool;
use uuid::Uuid;

const ADDRESS_COLUMNS: &str = "id, user_id, address_type, full_name, mobile_number, email_address, \
    address_line_1, address_line_2, pincode, city, state, landmark, is_default";

pub struct PgAddressRepository {
    pool: PgPool,
}

impl PgAddressRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: Uuid,
    user_id: String,
    address_type: String,
    full_name: String,
    mobile_number: String,
    email_address: String,
    address_line_1: String,
    address_line_2: String,
    pincode: String,
    city: String,
    state: String,
    landmark: String,
    is_default: bool,
}

impl AddressRow {
    fn into_address(self) -> Result<UserAddress, RepoError> {
        let address_type = AddressType::parse(&self.address_type)
            .ok_or_else(|| format!("unknown address type '{}'", self.address_type))?;
        Ok(UserAddress {
            id: self.id,
            user_id: self.user_id,
            address_type,
            full_name: self.full_name,
            mobile_number: Masked(self.mobile_number),
            email_address: Masked(self.email_address),
            address_line_1: self.address_line_1,
            address_line_2: self.address_line_2,
            pincode: self.pincode,
            city: self.city,
            state: self.state,
            landmark: self.landmark,
            is_default: self.is_default,
        })
    }
}

#[async_trait]
impl AddressRepository for PgAddressRepository {
    async fn create_address(&self, address: &UserAddress) -> Result<Uuid, RepoError> {
        let mut tx = self.pool.begin().await?;

        if address.is_default {
            sqlx::query("UPDATE user_addresses SET is_default = FALSE WHERE user_id = $1")
                .bind(&address.user_id)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO user_addresses (id, user_id, address_type, full_name, mobile_number,
                email_address, address_line_1, address_line_2, pincode, city, state, landmark, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(address.id)
        .bind(&address.user_id)
        .bind(address.address_type.as_str())
        .bind(&address.full_name)
        .bind(address.mobile_number.expose())
        .bind(address.email_address.expose())
        .bind(&address.address_line_1)
        .bind(&address.address_line_2)
        .bind(address.pincode.trim())
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.landmark)
        .bind(address.is_default)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(address.id)
    }

    async fn get_address(&self, id: Uuid, user_id: &str) -> Result<Option<UserAddress>, RepoError> {
        let sql = format!(
            "SELECT {} FROM user_addresses WHERE id = $1 AND user_id = $2",
            ADDRESS_COLUMNS
        );
        let row: Option<AddressRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(AddressRow::into_address).transpose()
    }

    async fn list_addresses(&self, user_id: &str) -> Result<Vec<UserAddress>, RepoError> {
        let sql = format!(
            "SELECT {} FROM user_addresses WHERE user_id = $1 ORDER BY is_default DESC, created_at DESC",
            ADDRESS_COLUMNS
        );
        let rows: Vec<AddressRow> = sqlx::query_as(&sql).bind(user_id).fetch_all(&self.pool).await?;
        rows.into_iter().map(AddressRow::into_address).collect()
    }
}
