use http::header;
use hyper::StatusCode;
use routrie::{Context, Router};

mod support;

#[tokio::test]
async fn serves_the_root_route() {
    let mut router = Router::new();
    router.get("/", |ctx: Context| async move {
        assert!(ctx.params().is_empty());
        ctx.string(StatusCode::OK, "root")
    });

    let app = support::serve(router);
    let res = app.get("/").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, "root");
}

#[tokio::test]
async fn echoes_a_route_parameter() {
    let mut router = Router::new();
    router.get("/users/:id", |ctx: Context| async move {
        ctx.string(StatusCode::OK, ctx.param("id").unwrap_or_default())
    });

    let app = support::serve(router);
    let res = app.get("/users/123").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, "123");
}

#[tokio::test]
async fn captures_the_catch_all_remainder() {
    let mut router = Router::new();
    router.get("/static/*filepath", |ctx: Context| async move {
        ctx.string(StatusCode::OK, ctx.param("filepath").unwrap_or_default())
    });

    let app = support::serve(router);
    let res = app.get("/static/css/main.css").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, "/css/main.css");
}

#[tokio::test]
async fn joins_multiple_parameters() {
    let mut router = Router::new();
    router.get("/a/:b/c/:d", |ctx: Context| async move {
        let joined = format!(
            "{}-{}",
            ctx.param("b").unwrap_or_default(),
            ctx.param("d").unwrap_or_default()
        );
        ctx.string(StatusCode::OK, joined)
    });

    let app = support::serve(router);
    let res = app.get("/a/1/c/2").await;
    assert_eq!(res.body, "1-2");
}

#[tokio::test]
async fn wrong_method_is_405_with_allow() {
    let mut router = Router::new();
    router.get("/exists", |ctx: Context| async move {
        ctx.string(StatusCode::OK, "ok")
    });

    let app = support::serve(router);
    let res = app.send(app.request("POST", "/exists")).await;
    assert_eq!(res.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(res.body, "Method Not Allowed");
    assert_eq!(res.headers.get(header::ALLOW).unwrap(), "GET");
}

#[tokio::test]
async fn unknown_path_is_404() {
    let mut router = Router::new();
    router.get("/exists", |ctx: Context| async move {
        ctx.string(StatusCode::OK, "ok")
    });

    let app = support::serve(router);
    let res = app.get("/nope").await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.body, "Not Found");
}

#[tokio::test]
async fn params_survive_percent_decoding() {
    let mut router = Router::new();
    router.get("/users/:name", |ctx: Context| async move {
        ctx.string(StatusCode::OK, ctx.param("name").unwrap_or_default())
    });

    let app = support::serve(router);
    let res = app.get("/users/jo%20hn").await;
    assert_eq!(res.body, "jo hn");
}

#[tokio::test]
async fn reads_query_and_body() {
    let mut router = Router::new();
    router.post("/echo", |ctx: Context| async move {
        let tag = ctx.query("tag").unwrap_or_default();
        let body = ctx.body_bytes().await?;
        ctx.string(
            StatusCode::OK,
            format!("{}:{}", tag, String::from_utf8_lossy(&body)),
        )
    });

    let app = support::serve(router);
    let res = app
        .send_body(app.request("POST", "/echo?tag=in"), "payload".into())
        .await;
    assert_eq!(res.body, "in:payload");
}

#[tokio::test]
async fn json_responses_carry_the_content_type() {
    let mut router = Router::new();
    router.get("/users/:id", |ctx: Context| async move {
        let id = ctx.param("id").unwrap_or_default();
        ctx.json(StatusCode::OK, &serde_json::json!({ "user_id": id }))
    });

    let app = support::serve(router);
    let res = app.get("/users/7").await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        res.headers.get(header::CONTENT_TYPE).unwrap(),
        "application/json; charset=utf-8"
    );
    assert_eq!(res.body, r#"{"user_id":"7"}"#);
}

#[tokio::test]
async fn trailing_slash_redirect_is_opt_in() {
    let mut distinct = Router::new();
    distinct.get("/users", |ctx: Context| async move {
        ctx.string(StatusCode::OK, "bare")
    });
    let app = support::serve(distinct);
    assert_eq!(app.get("/users/").await.status, StatusCode::NOT_FOUND);

    let mut redirecting = Router::new();
    redirecting.redirect_trailing_slash(true);
    redirecting.get("/users", |ctx: Context| async move {
        ctx.string(StatusCode::OK, "bare")
    });
    let app = support::serve(redirecting);
    let res = app.get("/users/").await;
    assert_eq!(res.status, StatusCode::MOVED_PERMANENTLY);
    assert_eq!(res.headers.get(header::LOCATION).unwrap(), "/users");
}

#[tokio::test]
async fn handler_errors_become_500s() {
    let mut router = Router::new();
    router.get("/fail", |_: Context| async move {
        Err::<(), routrie::RouteError>(routrie::Error::new("boom").into())
    });

    let app = support::serve(router);
    let res = app.get("/fail").await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.body, "Internal Server Error");
}
