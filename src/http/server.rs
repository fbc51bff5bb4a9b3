use log::{debug, info};
use rouille::{Request, Response};
use serde::Serialize;
use std::{
    sync::{Arc, Mutex, MutexGuard},
    thread,
};

use crate::{
    checkout::{
        artifacts::{Artifact, ArtifactBody, ArtifactSink},
        flow::{PaymentField, SuccessDownload},
        payment::{PaymentSimulator, PendingPayment},
    },
    clipboard::{COPY_CONFIRMATION, Clipboard},
    config::HttpConfig,
    domain::{
        purchase::PurchaseId,
        track::{Track, TrackId},
    },
    http::error::ApiError,
    preview::ClockMedia,
    session::{Storefront, complete_payment, lock_store},
    store::cart::Cart,
};

pub type SharedStore = Arc<Mutex<Storefront<ClockMedia>>>;

pub struct HttpServer {
    store: SharedStore,
    payments: Arc<PaymentSimulator>,
    sink: Arc<dyn ArtifactSink>,
    clipboard: Arc<dyn Clipboard>,
    pub config: HttpConfig,
}

impl HttpServer {
    pub fn new(
        store: Storefront<ClockMedia>,
        payments: PaymentSimulator,
        sink: Arc<dyn ArtifactSink>,
        clipboard: Arc<dyn Clipboard>,
        config: HttpConfig,
    ) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
            payments: Arc::new(payments),
            sink,
            clipboard,
            config,
        }
    }

    pub fn run(self) {
        let addr = format!("{}:{}", self.config.bind_addr, self.config.port);
        rouille::start_server(addr, move |request| self.handle_request(request));
    }

    fn handle_request(&self, request: &Request) -> Response {
        Self::log_request(request);

        let result = rouille::router!(request,
            (GET) (/tracks) => {
                self.list_tracks(request)
            },

            (GET) (/cart) => {
                Ok(self.cart_response())
            },
            (DELETE) (/cart) => {
                self.store().remove_from_cart();
                Ok(self.cart_response())
            },
            (POST) (/cart/toggle) => {
                self.store().toggle_cart();
                Ok(self.cart_response())
            },
            (POST) (/cart/{id: String}) => {
                self.add_to_cart(id)
            },

            (POST) (/checkout) => {
                self.open_checkout()
            },
            (GET) (/checkout) => {
                self.checkout_view()
            },
            (DELETE) (/checkout) => {
                self.store().close_checkout();
                Ok(Response::empty_204())
            },
            (POST) (/checkout/advance) => {
                self.advance_checkout()
            },
            (POST) (/checkout/back) => {
                self.checkout_back()
            },
            (POST) (/checkout/copy/{field: String}) => {
                self.copy_payment_field(&field)
            },
            (POST) (/checkout/confirm) => {
                self.confirm_payment()
            },
            (GET) (/checkout/download/{kind: String}) => {
                self.checkout_download(&kind)
            },

            (GET) (/preview) => {
                Ok(Response::json(&self.store().preview_status()))
            },
            (DELETE) (/preview) => {
                let mut store = self.store();
                store.stop_preview();
                Ok(Response::json(&store.preview_status()))
            },
            (POST) (/preview/toggle) => {
                let mut store = self.store();
                store.toggle_preview();
                Ok(Response::json(&store.preview_status()))
            },
            (POST) (/preview/cart) => {
                self.add_preview_to_cart()
            },
            (POST) (/preview/{id: String}) => {
                self.start_preview(id)
            },

            (GET) (/purchases) => {
                Ok(Response::json(&self.store().history_rows()))
            },
            (GET) (/purchases/{id: String}/audio) => {
                self.purchase_audio(id)
            },

            _ => Ok(Response::empty_404())
        );

        let response = result.unwrap_or_else(|e| {
            debug!("request failed: {e}");
            e.into_response()
        });

        info!("Response: {} {}", request.method(), response.status_code);
        response
    }

    fn log_request(request: &Request) {
        info!("{} {}", request.method(), request.url());
    }

    fn store(&self) -> MutexGuard<'_, Storefront<ClockMedia>> {
        lock_store(&self.store)
    }

    fn list_tracks(&self, request: &Request) -> Result<Response, ApiError> {
        let query = request.get_param("q").unwrap_or_default();
        let store = self.store();
        Ok(Response::json(&store.list_tracks(&query)))
    }

    fn cart_response(&self) -> Response {
        Response::json(&CartResponse::from_domain(self.store().cart()))
    }

    fn add_to_cart(&self, id: String) -> Result<Response, ApiError> {
        self.store().add_to_cart(&TrackId::new(id))?;
        Ok(self.cart_response())
    }

    fn open_checkout(&self) -> Result<Response, ApiError> {
        let mut store = self.store();
        let view = store.open_checkout()?.view();
        Ok(Response::json(&view).with_status_code(201))
    }

    fn checkout_view(&self) -> Result<Response, ApiError> {
        let store = self.store();
        let flow = store
            .checkout()
            .ok_or_else(|| ApiError::NotFound("no checkout in progress".into()))?;
        Ok(Response::json(&flow.view()))
    }

    fn advance_checkout(&self) -> Result<Response, ApiError> {
        self.store().advance_checkout(&mut rand::thread_rng())?;
        self.checkout_view()
    }

    fn checkout_back(&self) -> Result<Response, ApiError> {
        self.store().checkout_back()?;
        self.checkout_view()
    }

    fn copy_payment_field(&self, field: &str) -> Result<Response, ApiError> {
        let field: PaymentField = field.parse().map_err(ApiError::BadRequest)?;
        let value = self
            .store()
            .copy_payment_field(field, self.clipboard.as_ref())?;
        Ok(Response::json(&CopyResponse {
            value,
            message: COPY_CONFIRMATION,
        }))
    }

    /// Accepts the confirmation and settles it on a background thread.
    fn confirm_payment(&self) -> Result<Response, ApiError> {
        let (pending, view) = {
            let mut store = self.store();
            let pending = store.begin_payment()?;
            let view = store.checkout().map(|flow| flow.view());
            (pending, view)
        };
        self.spawn_payment(pending);
        Ok(Response::json(&view).with_status_code(202))
    }

    fn spawn_payment(&self, pending: PendingPayment) {
        let store = Arc::clone(&self.store);
        let payments = Arc::clone(&self.payments);
        let sink = Arc::clone(&self.sink);
        thread::spawn(move || {
            if let Some(purchase) = complete_payment(&store, pending, &payments, sink.as_ref()) {
                info!("purchase {} completed", purchase.id);
            }
        });
    }

    fn checkout_download(&self, kind: &str) -> Result<Response, ApiError> {
        let kind: SuccessDownload = kind.parse().map_err(ApiError::BadRequest)?;
        let artifact = self.store().success_artifact(kind)?;
        Ok(Self::artifact_response(artifact))
    }

    fn start_preview(&self, id: String) -> Result<Response, ApiError> {
        let mut store = self.store();
        store.start_preview(&TrackId::new(id))?;
        Ok(Response::json(&store.preview_status()))
    }

    fn add_preview_to_cart(&self) -> Result<Response, ApiError> {
        let mut store = self.store();
        store
            .add_preview_to_cart()
            .ok_or_else(|| ApiError::NotFound("no active preview".into()))?;
        Ok(Response::json(&CartResponse::from_domain(store.cart())))
    }

    fn purchase_audio(&self, id: String) -> Result<Response, ApiError> {
        let artifact = self
            .store()
            .history_artifact(&PurchaseId(id.clone()))
            .ok_or_else(|| ApiError::NotFound(format!("purchase {} not found", id)))?;
        Ok(Self::artifact_response(artifact))
    }

    /// text bodies are served as attachments, remote audio as a redirect
    fn artifact_response(artifact: Artifact) -> Response {
        match artifact.body {
            ArtifactBody::Remote { url } => {
                debug!("DOWNLOAD {} -> {}", artifact.filename, url);
                Response::redirect_302(url)
            }
            ArtifactBody::Text { content } => {
                let mime = mime_guess::from_path(&artifact.filename).first_or_text_plain();
                Response::from_data(format!("{}; charset=utf-8", mime), content)
                    .with_content_disposition_attachment(&artifact.filename)
            }
        }
    }
}

#[derive(Serialize)]
struct CartResponse {
    track: Option<Track>,
    open: bool,
    total: String,
}

impl CartResponse {
    fn from_domain(cart: &Cart) -> Self {
        Self {
            track: cart.contents().cloned(),
            open: cart.is_open(),
            total: cart.total().to_string(),
        }
    }
}

#[derive(Serialize)]
struct CopyResponse {
    value: String,
    message: &'static str,
}

#[cfg(test)]
pub fn parse_json_response<T: serde::de::DeserializeOwned>(
    response: rouille::Response,
) -> anyhow::Result<T> {
    Ok(serde_json::from_reader(
        response.data.into_reader_and_size().0,
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        checkout::artifacts::tests::RecordingSink,
        clipboard::MemoryClipboard,
        config::StoreConfig,
        license::Unconfigured,
        store::seed::seed_tracks,
    };

    use rouille::Request;
    use serde_json::Value;
    use std::{io::Read, time::Duration};

    pub fn parse_text_response(response: rouille::Response) -> anyhow::Result<String> {
        let mut buf = String::new();
        let mut reader = response.data.into_reader_and_size().0;
        reader.read_to_string(&mut buf)?;
        Ok(buf)
    }

    struct Fixture {
        server: HttpServer,
        sink: Arc<RecordingSink>,
        clipboard: Arc<MemoryClipboard>,
    }

    fn create_server() -> Fixture {
        let store =
            Storefront::new(seed_tracks(), ClockMedia::new(), StoreConfig::default()).unwrap();
        let payments =
            PaymentSimulator::new(Duration::ZERO, "Cliente Muvuka".into(), Arc::new(Unconfigured));
        let sink = Arc::new(RecordingSink::default());
        let clipboard = Arc::new(MemoryClipboard::default());

        let server = HttpServer::new(
            store,
            payments,
            sink.clone(),
            clipboard.clone(),
            HttpConfig {
                bind_addr: "0.0.0.0".to_string(),
                port: 8080,
            },
        );
        Fixture {
            server,
            sink,
            clipboard,
        }
    }

    fn call(server: &HttpServer, method: &str, url: &str) -> Response {
        let request = Request::fake_http(method, url, vec![], vec![]);
        server.handle_request(&request)
    }

    fn header<'a>(response: &'a Response, name: &str) -> Option<&'a str> {
        response
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_ref())
    }

    /// cart -> checkout -> payment step
    fn to_payment_step(server: &HttpServer, track: &str) {
        assert_eq!(call(server, "POST", &format!("/cart/{track}")).status_code, 200);
        assert_eq!(call(server, "POST", "/checkout").status_code, 201);
        assert_eq!(call(server, "POST", "/checkout/advance").status_code, 200);
    }

    fn wait_for_success(server: &HttpServer) -> anyhow::Result<Value> {
        for _ in 0..200 {
            let view: Value = parse_json_response(call(server, "GET", "/checkout"))?;
            if view["step"] == "success" {
                return Ok(view);
            }
            thread::sleep(Duration::from_millis(10));
        }
        anyhow::bail!("payment never completed")
    }

    // --------------------------------------------------
    // catalog
    // --------------------------------------------------

    #[test]
    fn test_http_list_tracks() -> anyhow::Result<()> {
        let f = create_server();

        let all: Vec<Value> = parse_json_response(call(&f.server, "GET", "/tracks"))?;
        assert_eq!(all.len(), 6);

        let filtered: Vec<Value> =
            parse_json_response(call(&f.server, "GET", "/tracks?q=kizomba"))?;
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0]["id"], "1");
        Ok(())
    }

    #[test]
    fn test_http_unknown_route() {
        let f = create_server();
        assert_eq!(call(&f.server, "GET", "/nope").status_code, 404);
    }

    // --------------------------------------------------
    // cart
    // --------------------------------------------------

    #[test]
    fn test_http_cart_add_and_clear() -> anyhow::Result<()> {
        let f = create_server();

        let cart: Value = parse_json_response(call(&f.server, "POST", "/cart/4"))?;
        assert_eq!(cart["track"]["id"], "4");
        assert_eq!(cart["open"], true);
        assert_eq!(cart["total"], "30 000 AOA");

        let cart: Value = parse_json_response(call(&f.server, "POST", "/cart/toggle"))?;
        assert_eq!(cart["open"], false);

        let cart: Value = parse_json_response(call(&f.server, "DELETE", "/cart"))?;
        assert!(cart["track"].is_null());
        assert_eq!(cart["total"], "0 AOA");
        Ok(())
    }

    #[test]
    fn test_http_cart_unknown_track() {
        let f = create_server();
        assert_eq!(call(&f.server, "POST", "/cart/42").status_code, 404);
    }

    // --------------------------------------------------
    // checkout
    // --------------------------------------------------

    #[test]
    fn test_http_checkout_empty_cart() {
        let f = create_server();
        assert_eq!(call(&f.server, "POST", "/checkout").status_code, 409);
        assert_eq!(call(&f.server, "GET", "/checkout").status_code, 404);
        assert_eq!(call(&f.server, "POST", "/checkout/confirm").status_code, 404);
    }

    #[test]
    fn test_http_checkout_steps() -> anyhow::Result<()> {
        let f = create_server();
        to_payment_step(&f.server, "2");

        let view: Value = parse_json_response(call(&f.server, "GET", "/checkout"))?;
        assert_eq!(view["step"], "payment");
        assert_eq!(view["payment"]["entity"], "00342");
        assert_eq!(view["price"], "25 000 AOA");

        let view: Value = parse_json_response(call(&f.server, "POST", "/checkout/back"))?;
        assert_eq!(view["step"], "info");
        assert_eq!(call(&f.server, "POST", "/checkout/back").status_code, 409);

        assert_eq!(call(&f.server, "DELETE", "/checkout").status_code, 204);
        assert_eq!(call(&f.server, "GET", "/checkout").status_code, 404);
        Ok(())
    }

    #[test]
    fn test_http_copy_reference() -> anyhow::Result<()> {
        let f = create_server();
        to_payment_step(&f.server, "1");

        let copied: Value =
            parse_json_response(call(&f.server, "POST", "/checkout/copy/reference"))?;
        assert_eq!(copied["message"], COPY_CONFIRMATION);
        assert_eq!(copied["value"].as_str(), f.clipboard.last().as_deref());

        assert_eq!(
            call(&f.server, "POST", "/checkout/copy/iban").status_code,
            400
        );
        Ok(())
    }

    #[test]
    fn test_http_full_purchase() -> anyhow::Result<()> {
        let f = create_server();
        call(&f.server, "POST", "/preview/1");
        to_payment_step(&f.server, "1");

        let confirm = call(&f.server, "POST", "/checkout/confirm");
        assert_eq!(confirm.status_code, 202);

        let view = wait_for_success(&f.server)?;
        assert_eq!(view["license_generated"], false);
        let purchase_id = view["purchase"]["id"].as_str().unwrap_or_default().to_string();
        assert!(purchase_id.starts_with("PUR-"));

        let tracks: Vec<Value> = parse_json_response(call(&f.server, "GET", "/tracks"))?;
        assert_eq!(tracks.len(), 5);
        let cart: Value = parse_json_response(call(&f.server, "GET", "/cart"))?;
        assert!(cart["track"].is_null());
        let preview: Value = parse_json_response(call(&f.server, "GET", "/preview"))?;
        assert_eq!(preview["state"], "idle");

        let rows: Vec<Value> = parse_json_response(call(&f.server, "GET", "/purchases"))?;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["index"], 1);
        assert_eq!(rows[0]["track"]["title"], "Kizomba Nights");

        let mut delivered = Vec::new();
        for _ in 0..200 {
            delivered = f.sink.filenames();
            if delivered.len() == 2 {
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(
            delivered,
            vec![
                "Kizomba Nights - Producer Pro.mp3".to_string(),
                format!("Comprovativo_Muvuka_{purchase_id}.txt"),
            ]
        );
        Ok(())
    }

    #[test]
    fn test_http_success_downloads() -> anyhow::Result<()> {
        let f = create_server();
        to_payment_step(&f.server, "3");
        assert_eq!(
            call(&f.server, "GET", "/checkout/download/license").status_code,
            409
        );
        call(&f.server, "POST", "/checkout/confirm");
        let view = wait_for_success(&f.server)?;

        let license = call(&f.server, "GET", "/checkout/download/license");
        assert_eq!(license.status_code, 200);
        assert!(
            header(&license, "Content-Disposition")
                .is_some_and(|v| v.starts_with("attachment") && v.contains("Licenca_Muvuka_Semba"))
        );
        assert!(header(&license, "Content-Type").is_some_and(|v| v.starts_with("text/plain")));
        let text = parse_text_response(license)?;
        assert!(text.starts_with("Falha ao gerar"));

        let audio = call(&f.server, "GET", "/checkout/download/audio");
        assert_eq!(audio.status_code, 302);

        let purchase_id = view["purchase"]["id"].as_str().unwrap_or_default();
        let history = call(&f.server, "GET", &format!("/purchases/{purchase_id}/audio"));
        assert_eq!(history.status_code, 302);
        assert_eq!(
            call(&f.server, "GET", "/purchases/PUR-1/audio").status_code,
            404
        );
        assert_eq!(
            call(&f.server, "GET", "/checkout/download/video").status_code,
            400
        );
        Ok(())
    }

    // --------------------------------------------------
    // preview
    // --------------------------------------------------

    #[test]
    fn test_http_preview_lifecycle() -> anyhow::Result<()> {
        let f = create_server();

        let status: Value = parse_json_response(call(&f.server, "POST", "/preview/2"))?;
        assert_eq!(status["state"], "playing");
        assert_eq!(status["track_id"], "2");
        assert_eq!(status["limit_secs"], 20.0);

        let status: Value = parse_json_response(call(&f.server, "POST", "/preview/toggle"))?;
        assert_eq!(status["state"], "paused");

        let cart: Value = parse_json_response(call(&f.server, "POST", "/preview/cart"))?;
        assert_eq!(cart["track"]["id"], "2");

        let status: Value = parse_json_response(call(&f.server, "DELETE", "/preview"))?;
        assert_eq!(status["state"], "idle");
        assert_eq!(call(&f.server, "POST", "/preview/cart").status_code, 404);
        assert_eq!(call(&f.server, "POST", "/preview/99").status_code, 404);
        Ok(())
    }
}
