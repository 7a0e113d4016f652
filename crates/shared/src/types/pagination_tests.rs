use super::*;

#[test]
fn test_page_request_default() {
    let request = PageRequest::default();
    assert_eq!(request.page, 1);
    assert_eq!(request.per_page, 20);
}

#[test]
fn test_page_request_clamps() {
    let request = PageRequest::new(0, 0);
    assert_eq!(request.page, 1);
    assert_eq!(request.per_page, 1);

    let request = PageRequest::new(3, 10_000);
    assert_eq!(request.per_page, MAX_PER_PAGE);
    assert_eq!(request.limit(), u64::from(MAX_PER_PAGE));

    let raw = PageRequest {
        page: 0,
        per_page: 500,
    };
    let normalized = raw.normalized();
    assert_eq!(normalized.page, 1);
    assert_eq!(normalized.per_page, MAX_PER_PAGE);
}

#[test]
fn test_page_response_new() {
    let data = vec![1, 2, 3];
    let response = PageResponse::new(data.clone(), 1, 10, 3);

    assert_eq!(response.data, data);
    assert_eq!(response.meta.page, 1);
    assert_eq!(response.meta.per_page, 10);
    assert_eq!(response.meta.total, 3);
    assert_eq!(response.meta.total_pages, 1);
    assert!(!response.meta.has_next_page);
    assert!(!response.meta.has_previous_page);
}

#[test]
fn test_page_response_navigation_flags() {
    // 25 items, 10 per page -> 3 pages
    let first: PageResponse<i32> = PageResponse::new(vec![], 1, 10, 25);
    assert_eq!(first.meta.total_pages, 3);
    assert!(first.meta.has_next_page);
    assert!(!first.meta.has_previous_page);

    let middle: PageResponse<i32> = PageResponse::new(vec![], 2, 10, 25);
    assert!(middle.meta.has_next_page);
    assert!(middle.meta.has_previous_page);

    let last: PageResponse<i32> = PageResponse::new(vec![], 3, 10, 25);
    assert!(!last.meta.has_next_page);
    assert!(last.meta.has_previous_page);
}

#[test]
fn test_page_response_empty() {
    let response: PageResponse<i32> = PageResponse::new(vec![], 1, 10, 0);
    assert_eq!(response.meta.total_pages, 1);
    assert!(!response.meta.has_next_page);
}

