#[cfg(test)]
mod tests {
    use mfcli::api::attendance::{status_ok, Attendance, AttendanceConfig, AttendanceError, EventType};
    use mfcli::libs::entry::TimeEntry;
    use std::sync::{Arc, Mutex};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    // === Fixture HTTP server ===
    //
    // The attendance protocol is exercised offline against canned responses.
    // Each route is matched on "METHOD /path" (query string ignored); every
    // request the client makes is logged so tests can assert on cookies,
    // bodies, and call counts.

    #[derive(Debug, Clone)]
    struct Request {
        method: String,
        path: String,
        cookie: Option<String>,
        body: String,
    }

    #[derive(Debug, Clone)]
    struct Response {
        status: u16,
        headers: Vec<(&'static str, String)>,
        body: String,
    }

    impl Response {
        fn html(body: &str) -> Self {
            Self {
                status: 200,
                headers: Vec::new(),
                body: body.to_string(),
            }
        }

        fn status(status: u16) -> Self {
            Self {
                status,
                headers: Vec::new(),
                body: String::new(),
            }
        }

        fn cookie(mut self, session_id: &str) -> Self {
            self.headers.push(("Set-Cookie", format!("_session_id={}; path=/; HttpOnly", session_id)));
            self
        }

        fn redirect(location: &str) -> Self {
            Self {
                status: 302,
                headers: vec![("Location", location.to_string())],
                body: String::new(),
            }
        }
    }

    struct Server {
        base_url: String,
        requests: Arc<Mutex<Vec<Request>>>,
    }

    impl Server {
        async fn start(routes: Vec<(&'static str, Response)>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let base_url = format!("http://{}", listener.local_addr().unwrap());
            let requests: Arc<Mutex<Vec<Request>>> = Arc::new(Mutex::new(Vec::new()));

            let log = requests.clone();
            tokio::spawn(async move {
                loop {
                    let Ok((mut stream, _)) = listener.accept().await else {
                        break;
                    };
                    let Some(request) = read_request(&mut stream).await else {
                        continue;
                    };
                    let key = format!("{} {}", request.method, request.path.split('?').next().unwrap_or(""));
                    let response = routes
                        .iter()
                        .find(|(route, _)| *route == key)
                        .map(|(_, response)| response.clone())
                        .unwrap_or_else(|| Response::status(404));
                    log.lock().unwrap().push(request);
                    write_response(&mut stream, &response).await;
                }
            });

            Self { base_url, requests }
        }

        fn config(&self) -> AttendanceConfig {
            AttendanceConfig {
                office_account_name: "mycompany".to_string(),
                account_name_or_email: "user@example.com".to_string(),
                base_url: self.base_url.clone(),
            }
        }

        fn requests(&self) -> Vec<Request> {
            self.requests.lock().unwrap().clone()
        }
    }

    async fn read_request(stream: &mut TcpStream) -> Option<Request> {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        let header_end = loop {
            let n = stream.read(&mut chunk).await.ok()?;
            if n == 0 {
                return None;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = find(&buf, b"\r\n\r\n") {
                break pos;
            }
        };

        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let mut lines = head.lines();
        let mut request_line = lines.next()?.split_whitespace();
        let method = request_line.next()?.to_string();
        let path = request_line.next()?.to_string();

        let mut cookie = None;
        let mut content_length = 0usize;
        for line in lines {
            let Some((name, value)) = line.split_once(':') else {
                continue;
            };
            match name.to_ascii_lowercase().as_str() {
                "cookie" => cookie = Some(value.trim().to_string()),
                "content-length" => content_length = value.trim().parse().unwrap_or(0),
                _ => {}
            }
        }

        let mut body = buf[header_end + 4..].to_vec();
        while body.len() < content_length {
            let n = stream.read(&mut chunk).await.ok()?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&chunk[..n]);
        }

        Some(Request {
            method,
            path,
            cookie,
            body: String::from_utf8_lossy(&body).to_string(),
        })
    }

    async fn write_response(stream: &mut TcpStream, response: &Response) {
        let mut head = format!(
            "HTTP/1.1 {} Fixture\r\nContent-Length: {}\r\nConnection: close\r\n",
            response.status,
            response.body.len()
        );
        for (name, value) in &response.headers {
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str("\r\n");
        let _ = stream.write_all(head.as_bytes()).await;
        let _ = stream.write_all(response.body.as_bytes()).await;
        let _ = stream.flush().await;
    }

    fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
        haystack.windows(needle.len()).position(|window| window == needle)
    }

    /// Decodes an application/x-www-form-urlencoded body for assertions.
    fn decode(body: &str) -> String {
        let bytes = body.as_bytes();
        let mut out = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'+' => {
                    out.push(b' ');
                    i += 1;
                }
                b'%' if i + 2 < bytes.len() => {
                    let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).unwrap();
                    out.push(u8::from_str_radix(hex, 16).unwrap());
                    i += 3;
                }
                byte => {
                    out.push(byte);
                    i += 1;
                }
            }
        }
        String::from_utf8(out).unwrap()
    }

    // === Canned pages ===

    const LOGIN_PAGE: &str = r#"
        <html><body><form action="/employee_session" method="post">
        <input type="hidden" name="authenticity_token" value="login_token" />
        </form></body></html>
    "#;

    const LANDING_PAGE: &str = r#"
        <html><head><meta name="js:rollbar:uid" content="emp42"></head><body>
        <form><input type="hidden" name="authenticity_token" value="t_clock_in">
            <input type="submit" value="clock_in"></form>
        <form><input type="hidden" name="authenticity_token" value="t_clock_out">
            <input type="submit" value="clock_out"></form>
        <form><input type="hidden" name="authenticity_token" value="t_start_break">
            <input type="submit" value="start_break"></form>
        <form><input type="hidden" name="authenticity_token" value="t_end_break">
            <input type="submit" value="end_break"></form>
        <input id="web_time_recorder_form_office_location_id" type="hidden" value="loc7">
        </body></html>
    "#;

    const EDIT_PAGE: &str = r#"
        <html><body><form action="" method="post">
        <input type="hidden" name="authenticity_token" value="edit_token" />
        </form></body></html>
    "#;

    fn login_routes() -> Vec<(&'static str, Response)> {
        vec![
            ("GET /employee_session/new", Response::html(LOGIN_PAGE).cookie("pre_login")),
            ("POST /employee_session", Response::redirect("/my_page").cookie("rotated")),
            ("GET /my_page", Response::html(LANDING_PAGE).cookie("final")),
        ]
    }

    async fn login(server: &Server) -> (Attendance, mfcli::api::attendance::AttendanceSession) {
        let attendance = Attendance::new(&server.config()).unwrap();
        let session = attendance.login("mycompany", "user@example.com", "p4ssw0rd").await.unwrap();
        (attendance, session)
    }

    // === Login ===

    #[tokio::test]
    async fn test_login_extracts_identifiers_and_rotates_cookies() {
        let server = Server::start(login_routes()).await;
        let (_, session) = login(&server).await;

        assert_eq!(session.employee_id(), "emp42");
        assert_eq!(session.location_id(), "loc7");

        let requests = server.requests();
        assert_eq!(requests.len(), 3);
        // Step 1 carries no cookie; step 2 replays the pre-login cookie with
        // the scraped token and credentials; step 3 uses the rotated cookie.
        assert_eq!(requests[0].cookie, None);
        assert_eq!(requests[1].cookie.as_deref(), Some("_session_id=pre_login"));
        let form = decode(&requests[1].body);
        assert!(form.contains("authenticity_token=login_token"));
        assert!(form.contains("employee_session_form[office_account_name]=mycompany"));
        assert!(form.contains("employee_session_form[account_name_or_email]=user@example.com"));
        assert!(form.contains("employee_session_form[password]=p4ssw0rd"));
        assert_eq!(requests[2].cookie.as_deref(), Some("_session_id=rotated"));
    }

    /// The handle must carry the cookie from the final response, never an
    /// intermediate one. Observable through the next request's Cookie header.
    #[tokio::test]
    async fn test_session_uses_final_response_cookie() {
        let mut routes = login_routes();
        routes.push(("POST /my_page/web_time_recorder", Response::status(200)));
        let server = Server::start(routes).await;
        let (attendance, session) = login(&server).await;

        attendance.record(&session, EventType::ClockIn).await.unwrap();

        let requests = server.requests();
        // Requests 3 and 4 belong to record(); both must use the rotated
        // final cookie.
        assert_eq!(requests[3].cookie.as_deref(), Some("_session_id=final"));
        assert_eq!(requests[4].cookie.as_deref(), Some("_session_id=final"));
    }

    /// Relative `Location` targets are not guaranteed a leading slash; the
    /// resolved URL must still get one.
    #[tokio::test]
    async fn test_login_resolves_slashless_redirect_target() {
        let server = Server::start(vec![
            ("GET /employee_session/new", Response::html(LOGIN_PAGE).cookie("pre_login")),
            ("POST /employee_session", Response::redirect("my_page").cookie("rotated")),
            ("GET /my_page", Response::html(LANDING_PAGE).cookie("final")),
        ])
        .await;
        let (_, session) = login(&server).await;

        assert_eq!(session.employee_id(), "emp42");
        assert_eq!(server.requests().last().unwrap().path, "/my_page");
    }

    #[tokio::test]
    async fn test_login_http_failure_short_circuits() {
        let server = Server::start(vec![("GET /employee_session/new", Response::status(500))]).await;
        let attendance = Attendance::new(&server.config()).unwrap();

        let err = attendance.login("c", "u", "p").await.unwrap_err();
        assert!(matches!(err, AttendanceError::Http(status) if status.as_u16() == 500));
        // No further network calls after the failing one.
        assert_eq!(server.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_login_missing_token_is_typed_error() {
        let server = Server::start(vec![(
            "GET /employee_session/new",
            Response::html("<html><body>maintenance</body></html>").cookie("pre_login"),
        )])
        .await;
        let attendance = Attendance::new(&server.config()).unwrap();

        let err = attendance.login("c", "u", "p").await.unwrap_err();
        assert!(matches!(err, AttendanceError::Scrape(_)));
    }

    // === Point-in-time recording ===

    #[tokio::test]
    async fn test_record_selects_matching_button_token() {
        let mut routes = login_routes();
        routes.push(("POST /my_page/web_time_recorder", Response::status(200)));
        let server = Server::start(routes).await;
        let (attendance, session) = login(&server).await;

        let status = attendance.record(&session, EventType::StartBreak).await.unwrap();
        assert!(status.is_success());

        let post = server.requests().into_iter().last().unwrap();
        assert_eq!(post.method, "POST");
        assert_eq!(post.path, "/my_page/web_time_recorder");
        let form = decode(&post.body);
        // The start_break button's own token, not a sibling's.
        assert!(form.contains("authenticity_token=t_start_break"));
        assert!(form.contains("web_time_recorder_form[event]=start_break"));
        assert!(form.contains("web_time_recorder_form[office_location_id]=loc7"));
        // ISO-8601 with milliseconds next to an unpadded Y/M/D date.
        assert!(form.contains(".000Z"));
        assert!(form.contains("web_time_recorder_form[date]="));
    }

    /// Rails-style services answer a successful form POST with a 302 to the
    /// refreshed page. With redirects disabled that redirect is the success
    /// response, and `status_ok` must classify it as such.
    #[tokio::test]
    async fn test_record_redirect_response_counts_as_success() {
        let mut routes = login_routes();
        routes.push(("POST /my_page/web_time_recorder", Response::redirect("/my_page")));
        let server = Server::start(routes).await;
        let (attendance, session) = login(&server).await;

        let status = attendance.record(&session, EventType::ClockIn).await.unwrap();
        assert_eq!(status.as_u16(), 302);
        assert!(status_ok(status));
    }

    #[tokio::test]
    async fn test_record_failed_page_fetch_skips_post() {
        // Login lands on a separate page so /my_page can fail afterwards.
        let server = Server::start(vec![
            ("GET /employee_session/new", Response::html(LOGIN_PAGE).cookie("pre_login")),
            ("POST /employee_session", Response::redirect("/landing").cookie("rotated")),
            ("GET /landing", Response::html(LANDING_PAGE).cookie("final")),
            ("GET /my_page", Response::status(503)),
        ])
        .await;
        let (attendance, session) = login(&server).await;

        let status = attendance.record(&session, EventType::ClockIn).await.unwrap();
        assert_eq!(status.as_u16(), 503);

        // The failing GET short-circuits: no POST was attempted.
        let requests = server.requests();
        assert_eq!(requests.len(), 4);
        assert!(requests.iter().all(|request| request.path != "/my_page/web_time_recorder"));
    }

    // === Batch historical posting ===

    #[tokio::test]
    async fn test_post_entries_builds_positional_records() {
        let mut routes = login_routes();
        routes.push(("GET /my_page/attendances/2020-04-28/edit", Response::html(EDIT_PAGE)));
        routes.push(("POST /my_page/attendances/2020-04-28", Response::status(200)));
        let server = Server::start(routes).await;
        let (attendance, session) = login(&server).await;

        let date = chrono::NaiveDate::from_ymd_opt(2020, 4, 28).unwrap();
        let entries = vec![
            TimeEntry::parse("10:00,11:00", date).unwrap(),
            TimeEntry::parse("11:22,12:34", date).unwrap(),
        ];
        let status = attendance.post_entries(&session, &entries).await.unwrap();
        assert!(status.is_success());

        let post = server.requests().into_iter().last().unwrap();
        assert_eq!(post.method, "POST");
        // Employee id travels as a query parameter, not a form field.
        assert_eq!(post.path, "/my_page/attendances/2020-04-28?employee_id=emp42");

        let form = decode(&post.body);
        assert!(form.contains("_method=put"));
        assert!(form.contains("authenticity_token=edit_token"));
        assert!(form.contains("commit=保存"));

        let record = |index: usize, field: &str, value: &str| {
            format!("attendance_schedule_form[attendance_record_forms_attributes][{}][{}]={}", index, field, value)
        };
        assert!(form.contains(&record(0, "event", "clock_in")));
        assert!(form.contains(&record(0, "time", "10:00")));
        assert!(form.contains(&record(1, "event", "start_break")));
        assert!(form.contains(&record(1, "time", "11:00")));
        assert!(form.contains(&record(2, "event", "end_break")));
        assert!(form.contains(&record(2, "time", "11:22")));
        assert!(form.contains(&record(3, "event", "clock_out")));
        assert!(form.contains(&record(3, "time", "12:34")));
        for index in 0..4 {
            assert!(form.contains(&record(index, "date", "2020-04-28")));
            assert!(form.contains(&record(index, "office_location_id", "loc7")));
            assert!(form.contains(&record(index, "_destroy", "false")));
        }
    }

    #[tokio::test]
    async fn test_post_entries_sole_entry_pair() {
        let mut routes = login_routes();
        routes.push(("GET /my_page/attendances/2020-04-28/edit", Response::html(EDIT_PAGE)));
        routes.push(("POST /my_page/attendances/2020-04-28", Response::status(200)));
        let server = Server::start(routes).await;
        let (attendance, session) = login(&server).await;

        let date = chrono::NaiveDate::from_ymd_opt(2020, 4, 28).unwrap();
        let entries = vec![TimeEntry::parse("09:00,17:30", date).unwrap()];
        attendance.post_entries(&session, &entries).await.unwrap();

        let form = decode(&server.requests().into_iter().last().unwrap().body);
        assert!(form.contains("[0][event]=clock_in"));
        assert!(form.contains("[1][event]=clock_out"));
        assert!(!form.contains("start_break"));
        assert!(!form.contains("end_break"));
    }

    #[tokio::test]
    async fn test_post_entries_failed_edit_fetch_skips_post() {
        let mut routes = login_routes();
        routes.push(("GET /my_page/attendances/2020-04-28/edit", Response::status(503)));
        let server = Server::start(routes).await;
        let (attendance, session) = login(&server).await;

        let date = chrono::NaiveDate::from_ymd_opt(2020, 4, 28).unwrap();
        let entries = vec![TimeEntry::parse("10:00,11:00", date).unwrap()];
        let status = attendance.post_entries(&session, &entries).await.unwrap();
        assert_eq!(status.as_u16(), 503);

        let requests = server.requests();
        assert!(requests.iter().all(|request| request.method != "POST" || request.path == "/employee_session"));
    }

    #[tokio::test]
    async fn test_post_entries_rejects_empty_input() {
        let server = Server::start(login_routes()).await;
        let (attendance, session) = login(&server).await;

        let before = server.requests().len();
        let err = attendance.post_entries(&session, &[]).await.unwrap_err();
        assert!(matches!(err, AttendanceError::NoEntries));
        assert_eq!(server.requests().len(), before);
    }

    /// An interval whose stop crosses midnight would post a record dated the
    /// next day; it must be rejected like any other second date.
    #[tokio::test]
    async fn test_post_entries_rejects_entry_crossing_midnight() {
        let server = Server::start(login_routes()).await;
        let (attendance, session) = login(&server).await;

        let date = chrono::NaiveDate::from_ymd_opt(2020, 4, 28).unwrap();
        let entries = vec![TimeEntry::new(
            date.and_hms_opt(23, 0, 0).unwrap(),
            date.succ_opt().unwrap().and_hms_opt(0, 30, 0).unwrap(),
        )];
        let before = server.requests().len();
        let err = attendance.post_entries(&session, &entries).await.unwrap_err();
        assert!(matches!(err, AttendanceError::MixedDates));
        assert_eq!(server.requests().len(), before);
    }

    #[tokio::test]
    async fn test_post_entries_rejects_mixed_dates() {
        let server = Server::start(login_routes()).await;
        let (attendance, session) = login(&server).await;

        let entries = vec![
            TimeEntry::parse("10:00,11:00", chrono::NaiveDate::from_ymd_opt(2020, 4, 28).unwrap()).unwrap(),
            TimeEntry::parse("12:00,13:00", chrono::NaiveDate::from_ymd_opt(2020, 4, 29).unwrap()).unwrap(),
        ];
        let before = server.requests().len();
        let err = attendance.post_entries(&session, &entries).await.unwrap_err();
        assert!(matches!(err, AttendanceError::MixedDates));
        assert_eq!(server.requests().len(), before);
    }
}
