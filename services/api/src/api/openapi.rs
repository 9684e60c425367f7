//! OpenAPI schema aggregation for the Trellis API.
use crate::api::{
    admin, me, records, system,
    types::{
        CacheClearResponse, ErrorResponse, HealthStatus, MeResponse, PermissionSummary,
        RecordDocument, RecordListResponse, SystemInfo,
    },
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "trellis-api",
        version = "v1",
        description = "Trellis CRM API with row-level access filtering"
    ),
    paths(
        system::system_info,
        system::system_health,
        records::list_records,
        records::create_record,
        records::get_record,
        records::patch_record,
        records::delete_record,
        me::me,
        me::my_permissions,
        admin::clear_caches,
    ),
    components(schemas(
        ErrorResponse,
        HealthStatus,
        SystemInfo,
        RecordDocument,
        RecordListResponse,
        MeResponse,
        PermissionSummary,
        CacheClearResponse,
    )),
    tags(
        (name = "system", description = "Health and identity"),
        (name = "records", description = "Row-filtered collection access"),
        (name = "me", description = "Caller context"),
        (name = "admin", description = "Operator actions")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_record_paths() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/api/v1/data/{resource}"));
        assert!(paths.contains_key("/api/v1/data/{resource}/{id}"));
        assert!(paths.contains_key("/api/v1/me/permissions"));
        assert!(paths.contains_key("/api/v1/admin/caches/clear"));
    }
}
