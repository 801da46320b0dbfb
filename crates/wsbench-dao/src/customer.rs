//! Customer data access

use tracing::{debug, info};
use uuid::Uuid;
use wsbench_rdbc::prelude::*;

use crate::config::CustomerDaoConfig;
use crate::error::{parse_uuid, require, DaoError, Result};
use crate::model::{Address, Customer, Phone, PhoneType, MAX_ADDRESS_LINES};

const LIST_ALL: &str = "SELECT id,first_name,last_name FROM Customer";
const GET_CUSTOMER: &str =
    "SELECT id,first_name,last_name,birth_date,email FROM Customer WHERE id = ?";
const GET_ADDRESS: &str = "SELECT line1,line2,line3,line4,line5,line6,zip_code,city,country \
                           FROM address WHERE customer_id = ?";
const GET_PHONES: &str = "SELECT phone_type,number FROM phone WHERE customer_id = ?";
const DELETE_ALL: &str = "DELETE FROM Customer";
const ADD_CUSTOMER: &str = "INSERT INTO customer (id,first_name,last_name,birth_date,email) \
                            VALUES (?,?,?,?,?)";
const ADD_ADDRESS: &str = "INSERT INTO address \
                           (customer_id,line1,line2,line3,line4,line5,line6,zip_code,city,country) \
                           VALUES (?,?,?,?,?,?,?,?,?,?)";
const ADD_PHONE: &str = "INSERT INTO phone (customer_id,phone_type,number) VALUES (?,?,?)";

/// Customer, address and phone tables
#[derive(Debug, Clone)]
pub struct CustomerDao {
    template: RdbcTemplate,
    config: CustomerDaoConfig,
}

impl CustomerDao {
    /// Create a DAO over the configured customer data source
    pub fn new(sources: &DataSources, config: CustomerDaoConfig) -> Result<Self> {
        let config = config.validated()?;
        let template = sources.template(config.template.clone())?;
        Ok(Self { template, config })
    }

    /// Stream every customer's identifier and names
    pub async fn list_all(&self) -> Result<RowSequence<Customer>> {
        let customers = self
            .template
            .query_for_sequence_with_args(LIST_ALL, &[], |row, _| {
                Ok(Customer::summary(
                    row.try_uuid(0)?.to_string(),
                    row.try_opt_string(1)?,
                    row.try_opt_string(2)?,
                ))
            })
            .await?;
        Ok(customers)
    }

    /// Load one customer with address and phones
    pub async fn get_details(&self, id: &str) -> Result<Customer> {
        let uuid = parse_uuid(id)?;
        let args = [Value::Uuid(uuid)];

        let mut customer = self
            .template
            .query_for_optional(GET_CUSTOMER, &args, |row, _| {
                Ok(Customer {
                    id: Some(row.try_uuid(0)?.to_string()),
                    first_name: row.try_opt_string(1)?,
                    last_name: row.try_opt_string(2)?,
                    birth_date: row.try_opt_date(3)?,
                    email: row.try_opt_string(4)?,
                    ..Customer::default()
                })
            })
            .await?
            .ok_or_else(|| DaoError::not_found(format!("Customer {} does not exist", id)))?;

        customer.address = self
            .template
            .query_for_optional(GET_ADDRESS, &args, |row, _| {
                let lines = (0..MAX_ADDRESS_LINES)
                    .map(|idx| row.try_opt_string(idx))
                    .collect::<DriverResult<Vec<_>>>()?;
                Ok(Address::from_columns(
                    row.try_opt_string(6)?.map(|zip| zip.trim().to_owned()),
                    row.try_opt_string(7)?,
                    row.try_opt_string(8)?,
                    lines,
                ))
            })
            .await?;

        customer.phones = self
            .template
            .query(GET_PHONES, &args, |row, _| {
                let code = row.try_i16(0)?;
                let phone_type = PhoneType::from_code(code).ok_or_else(|| {
                    DriverError::type_conversion(format!("unknown phone type code {}", code))
                })?;
                Ok(Phone::new(phone_type, row.try_string(1)?))
            })
            .await?;

        Ok(customer)
    }

    /// Validate and insert a customer under a fresh identifier
    pub async fn create(&self, customer: &Customer) -> Result<String> {
        self.create_with_id(customer, Uuid::new_v4()).await
    }

    /// Validate and insert a customer, its address and its phones under `id`
    pub async fn create_with_id(&self, customer: &Customer, id: Uuid) -> Result<String> {
        require(
            "Customer first_name, last_name and birth_date has to be set",
            &[
                customer.first_name.is_some(),
                customer.last_name.is_some(),
                customer.birth_date.is_some(),
            ],
        )?;
        if let Some(address) = &customer.address {
            require(
                "Address lines, zip_code, city and country has to be set",
                &[
                    !address.lines.is_empty(),
                    address.zip_code.is_some(),
                    address.city.is_some(),
                    address.country.is_some(),
                ],
            )?;
        }

        self.template
            .update(
                ADD_CUSTOMER,
                &[
                    id.into(),
                    customer.first_name.clone().into(),
                    customer.last_name.clone().into(),
                    customer.birth_date.into(),
                    customer.email.clone().into(),
                ],
            )
            .await?;

        if let Some(address) = &customer.address {
            let mut args: Vec<Value> = Vec::with_capacity(10);
            args.push(id.into());
            args.extend((0..MAX_ADDRESS_LINES).map(|idx| Value::from(address.line(idx))));
            args.push(address.zip_code.clone().into());
            args.push(address.city.clone().into());
            args.push(address.country.clone().into());
            self.template.update(ADD_ADDRESS, &args).await?;
        }

        if !customer.phones.is_empty() {
            let result = self
                .template
                .batch_write(
                    ADD_PHONE,
                    futures::stream::iter(&customer.phones),
                    self.config.phone_batch_size,
                    |stmt, phone: &&Phone| {
                        stmt.bind(1, id.into())?;
                        stmt.bind(2, phone.phone_type.code().into())?;
                        stmt.bind(3, phone.number.as_str().into())
                    },
                )
                .await?;
            debug!(customer = %id, phones = result.item_count(), "Inserted phones");
        }

        Ok(id.to_string())
    }

    /// Delete every customer, then run the maintenance statements
    pub async fn delete_all(&self) -> Result<u64> {
        let deleted = self.template.update(DELETE_ALL, &[]).await?;
        for statement in &self.config.maintenance {
            self.template.update(statement, &[]).await?;
        }
        info!(deleted, maintenance = self.config.maintenance.len(), "Deleted all customers");
        Ok(deleted)
    }
}
