use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{CreatePatientRequest, Patient, PatientError, PatientSearchQuery};

const DEFAULT_PAGE: u32 = 50;
const MAX_PAGE: u32 = 200;

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Registers a patient found missing at the front desk. The store's
    /// unique RUT index reports duplicates as [`PatientError::DuplicateRut`].
    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient, PatientError> {
        let rut = required(request.rut.as_deref(), "rut")?;
        let first_name = required(request.first_name.as_deref(), "first_name")?;
        let last_name = required(request.last_name.as_deref(), "last_name")?;
        let phone = required(request.phone.as_deref(), "phone")?;
        let email = request
            .email
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty());

        debug!("Registering patient {}", rut);

        let body = json!({
            "rut": rut,
            "first_name": first_name,
            "last_name": last_name,
            "phone": phone,
            "email": email,
            "date_of_birth": request.date_of_birth,
        });

        let created: Vec<Patient> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/patients",
            Some(auth_token),
            Some(body),
            Some(return_representation()),
        ).await?;

        let patient = created
            .into_iter()
            .next()
            .ok_or_else(|| PatientError::DatabaseError("Insert returned no patient".to_string()))?;

        info!("Patient {} registered", patient.id);
        Ok(patient)
    }

    pub async fn get_patient(&self, patient_id: Uuid, auth_token: &str) -> Result<Patient, PatientError> {
        debug!("Fetching patient: {}", patient_id);

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let patients: Vec<Patient> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        patients.into_iter().next().ok_or(PatientError::NotFound)
    }

    /// Exact RUT match, or a case-insensitive partial match on either name,
    /// ordered by last name. One of the two filters is required.
    pub async fn search_patients(
        &self,
        query: PatientSearchQuery,
        auth_token: &str,
    ) -> Result<Vec<Patient>, PatientError> {
        let rut = query.rut.as_deref().map(str::trim).filter(|v| !v.is_empty());
        let name = query.name.as_deref().map(str::trim).filter(|v| !v.is_empty());

        let filter = match (rut, name) {
            (Some(rut), _) => format!("rut=eq.{}", urlencoding::encode(rut)),
            (None, Some(name)) => {
                let pattern = urlencoding::encode(&format!("*{}*", name)).into_owned();
                format!("or=(first_name.ilike.{0},last_name.ilike.{0})", pattern)
            }
            (None, None) => {
                return Err(PatientError::ValidationError("rut or name is required".to_string()));
            }
        };

        let limit = query.limit.unwrap_or(DEFAULT_PAGE).clamp(1, MAX_PAGE);
        let offset = query.offset.unwrap_or(0);
        let path = format!(
            "/rest/v1/patients?{}&order=last_name.asc,first_name.asc&limit={}&offset={}",
            filter, limit, offset
        );

        let patients: Vec<Patient> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        debug!("Patient search matched {} rows", patients.len());
        Ok(patients)
    }
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, PatientError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PatientError::ValidationError(format!("{} is required", field)))
}
