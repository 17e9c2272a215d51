//! The reqwest transport against a throwaway axum server speaking the same
//! shapes as the real services.

use std::net::{SocketAddr, TcpListener as StdListener};
use std::sync::mpsc;
use std::thread;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::routing::{delete, get, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use enrollment_admin::api::{self, ApiError, Endpoints, HttpTransport};
use enrollment_admin::error::{Action, Entity};
use enrollment_admin::models::{CoursePayload, StudentPayload};

fn spawn_server(router: Router) -> String {
    let (tx, rx) = mpsc::channel::<SocketAddr>();
    thread::spawn(move || {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        runtime.block_on(async move {
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, router).await.unwrap();
        });
    });
    format!("http://{}", rx.recv().unwrap())
}

fn transport(base: &str) -> HttpTransport {
    HttpTransport::with_endpoints(Endpoints::new(base, base)).unwrap()
}

async fn list_students() -> Json<Value> {
    Json(json!({
        "message": "Estudiantes obtenidos",
        "data": [{
            "id": 1,
            "nombre": "Ana",
            "apellido": "Lopez",
            "email": "ana@x.com",
            "fechaNacimiento": "2000-01-01T00:00:00.000Z",
            "telefono": null
        }, {
            "id": 2,
            "nombre": "Bruno",
            "apellido": "Diaz",
            "email": "bruno@x.com",
            "fechaNacimiento": 889_574_400_000_i64,
            "telefono": "3000000001"
        }, {
            "nombre": "Sin id"
        }]
    }))
}

async fn update_student(Path(id): Path<i64>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": format!("Estudiante {id} no encontrado") })),
    )
}

async fn list_courses() -> Json<Value> {
    Json(json!([
        { "id": 10, "nombre": "Algebra", "descripcion": "Linear algebra basics", "creditos": 4 }
    ]))
}

async fn create_course(Json(mut body): Json<Value>) -> (StatusCode, Json<Value>) {
    body["id"] = json!(11);
    (StatusCode::CREATED, Json(json!({ "message": "Curso creado", "data": body })))
}

async fn delete_course(Path(_id): Path<i64>) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": "El curso tiene estudiantes inscritos" })),
    )
}

async fn list_enrollments() -> Json<Value> {
    Json(json!([
        { "id": 50, "estudianteId": 1, "cursoId": 10 },
        { "id": 51, "estudianteId": 2, "cursoId": null }
    ]))
}

async fn delete_enrollment(Path(_id): Path<i64>) -> StatusCode {
    StatusCode::NO_CONTENT
}

fn services() -> Router {
    Router::new()
        .route("/api/estudiantes", get(list_students))
        .route("/api/estudiantes/{id}", put(update_student))
        .route("/api/cursos", get(list_courses).post(create_course))
        .route("/api/cursos/{id}", delete(delete_course))
        .route("/api/curso-estudiante", get(list_enrollments))
        .route("/api/curso-estudiante/{id}", delete(delete_enrollment))
}

#[test]
fn lists_decode_from_either_envelope() {
    let api = transport(&spawn_server(services()));

    let students = api::fetch_students(&api).unwrap();
    assert_eq!(students.records.len(), 2);
    assert_eq!(students.skipped, 1);
    assert_eq!(students.records[0].full_name(), "Ana Lopez");
    assert_eq!(students.records[0].phone, "");
    assert_eq!(students.records[1].birth_date, "1998-03-11");

    let courses = api::fetch_courses(&api).unwrap();
    assert_eq!(courses.records[0].credits, 4);

    let enrollments = api::fetch_enrollments(&api).unwrap();
    assert_eq!(enrollments.records[1].course_id, None);
}

#[test]
fn create_sends_service_field_names() {
    let api = transport(&spawn_server(services()));
    let payload = CoursePayload {
        name: "Chemistry".into(),
        description: "Atoms and reactions".into(),
        credits: 3,
    };

    let body = api::create_course(&api, &payload).unwrap();

    assert_eq!(
        body["data"],
        json!({ "id": 11, "nombre": "Chemistry", "descripcion": "Atoms and reactions", "creditos": 3 })
    );
}

#[test]
fn error_statuses_carry_the_server_message() {
    let api = transport(&spawn_server(services()));

    let err = api::delete_course(&api, 10).unwrap_err();
    assert_eq!(err.status(), Some(400));
    assert_eq!(
        err.user_message(Action::Delete(Entity::Course)),
        "Cannot delete the course: other records still depend on it."
    );

    let payload = StudentPayload {
        first_name: "Ana".into(),
        last_name: "Lopez".into(),
        email: "ana@x.com".into(),
        birth_date: "2000-01-01".into(),
        phone: "3001234567".into(),
    };
    let err = api::update_student(&api, 9, &payload).unwrap_err();
    match err {
        ApiError::Status { status, ref message } => {
            assert_eq!(status, 404);
            assert_eq!(message.as_deref(), Some("Estudiante 9 no encontrado"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn empty_success_body_is_null() {
    let api = transport(&spawn_server(services()));

    assert_eq!(api::delete_enrollment(&api, 50).unwrap(), Value::Null);
}

#[test]
fn unexpected_list_shape_is_reported() {
    let router = Router::new().route(
        "/api/cursos",
        get(|| async { Json(json!({ "message": "sin datos" })) }),
    );
    let api = transport(&spawn_server(router));

    let err = api::fetch_courses(&api).unwrap_err();
    assert!(matches!(err, ApiError::Shape(_)));
    assert_eq!(
        err.user_message(Action::Load(Entity::Course)),
        "Failed to load the courses: unexpected response format."
    );
}

#[test]
fn unreachable_service_is_a_transport_error() {
    let port = {
        let listener = StdListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let api = transport(&format!("http://127.0.0.1:{port}"));

    let err = api::fetch_students(&api).unwrap_err();
    assert!(matches!(err, ApiError::Transport(_)));
    assert_eq!(
        err.user_message(Action::Save(Entity::Student)),
        "Could not connect to the server."
    );
}
