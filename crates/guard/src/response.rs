#![forbid(unsafe_code)]

/// Body of the rejection page.
pub const FORBIDDEN_BODY: &str = concat!(
    "<!DOCTYPE html>\n",
    "<html lang=\"en\">\n",
    "<head><meta charset=\"UTF-8\" /><title>403 Forbidden</title></head>\n",
    "<body>\n",
    "<h1>403 Forbidden</h1>\n",
    "<p>This endpoint only accepts connections from the client that launched it. ",
    "Developer tools are available when the client runs in developer mode.</p>\n",
    "</body>\n",
    "</html>\n",
);

/// Full HTTP/1.1 403 response sent to a rejected peer before the socket is
/// closed.
pub fn forbidden_response(server: &str) -> String {
    format!(
        "HTTP/1.1 403 Forbidden\r\n\
         Content-Type: text/html\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         Server: {server}\r\n\
         \r\n\
         {FORBIDDEN_BODY}",
        FORBIDDEN_BODY.len(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn response_is_framed_correctly() {
        let response = forbidden_response("CEFSecureHook");
        let (head, body) = response.split_once("\r\n\r\n").unwrap();

        assert_eq!(body, FORBIDDEN_BODY);
        let content_length = format!("Content-Length: {}", FORBIDDEN_BODY.len());
        assert_eq!(
            head.split("\r\n").collect::<Vec<_>>(),
            vec![
                "HTTP/1.1 403 Forbidden",
                "Content-Type: text/html",
                content_length.as_str(),
                "Connection: close",
                "Server: CEFSecureHook",
            ]
        );
    }

    #[test]
    fn content_length_counts_bytes() {
        let response = forbidden_response("srv");
        let length: usize = response
            .lines()
            .find_map(|line| line.strip_prefix("Content-Length: "))
            .and_then(|value| value.trim().parse().ok())
            .unwrap();
        let body = response.split_once("\r\n\r\n").unwrap().1;
        assert_eq!(length, body.len());
    }
}
