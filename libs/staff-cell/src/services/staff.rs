use reqwest::Method;
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{CreateStaffRequest, StaffError, StaffKind, StaffMember, StaffRow};

/// Clinic staff directory. Login accounts are managed by the identity
/// provider; these tables only hold the clinic-facing profile.
pub struct StaffService {
    supabase: SupabaseClient,
}

impl StaffService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Doctors, receptionists and administrators in one list, by name.
    pub async fn list_staff(&self, auth_token: &str) -> Result<Vec<StaffMember>, StaffError> {
        let mut staff = Vec::new();

        for kind in StaffKind::ALL {
            let path = format!("/rest/v1/{}?order=name.asc", kind.table());
            let rows: Vec<StaffRow> = self.supabase.request(
                Method::GET,
                &path,
                Some(auth_token),
                None,
            ).await?;

            debug!("Loaded {} {} rows", rows.len(), kind);
            staff.extend(rows.into_iter().map(|row| StaffMember { kind, row }));
        }

        staff.sort_by_key(|member| member.row.name.to_lowercase());
        Ok(staff)
    }

    pub async fn create_staff(
        &self,
        request: CreateStaffRequest,
        auth_token: &str,
    ) -> Result<StaffMember, StaffError> {
        let name = request.name.trim();
        let email = request.email.trim();
        if name.is_empty() || email.is_empty() {
            return Err(StaffError::ValidationError("name and email are required".to_string()));
        }
        let phone = request.phone.as_deref().map(str::trim).filter(|v| !v.is_empty());

        let mut body = json!({
            "name": name,
            "email": email,
            "phone": phone,
        });
        if request.kind == StaffKind::Doctor {
            let specialty = request
                .specialty
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| StaffError::ValidationError("specialty is required for doctors".to_string()))?;
            body["specialty"] = json!(specialty);
        }

        let created: Vec<StaffRow> = self.supabase.request_with_headers(
            Method::POST,
            &format!("/rest/v1/{}", request.kind.table()),
            Some(auth_token),
            Some(body),
            Some(return_representation()),
        ).await?;

        let row = created
            .into_iter()
            .next()
            .ok_or_else(|| StaffError::DatabaseError("Insert returned no row".to_string()))?;

        info!("Added {} {}", request.kind, row.id);
        Ok(StaffMember { kind: request.kind, row })
    }

    /// Fails with [`StaffError::StillReferenced`] while clinic records
    /// point at the member.
    pub async fn delete_staff(&self, kind: StaffKind, id: Uuid, auth_token: &str) -> Result<(), StaffError> {
        let path = format!("/rest/v1/{}?id=eq.{}", kind.table(), id);
        let deleted: Vec<StaffRow> = self.supabase.request_with_headers(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
            Some(return_representation()),
        ).await?;

        if deleted.is_empty() {
            return Err(StaffError::NotFound);
        }

        info!("Removed {} {}", kind, id);
        Ok(())
    }
}
