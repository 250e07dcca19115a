use handle_errors::Error;
use std::collections::HashMap;

/// Pagination 구조체는 쿼리 매개변수에서 추출된다
#[derive(Default, Debug, PartialEq)]
pub struct Pagination {
    /// 반환될 아이템의 최대 개수
    /// None이면 PostgreSQL은 LIMIT을 무시한다.
    pub limit: Option<u32>,
    /// 건너뛸 아이템의 개수
    pub offset: u32,
}

/// 매개변수를 /questions 경로에서 추출하기
/// # 예제 쿼리
/// /questions?limit=10&offset=1
/// # 사용 예
/// ```rust,ignore
/// let mut query = HashMap::new();
/// query.insert("limit".to_string(), "1".to_string());
/// query.insert("offset".to_string(), "10".to_string());
/// let p = types::pagination::extract_pagination(query).unwrap();
/// assert_eq!(p.limit, Some(1));
/// assert_eq!(p.offset, 10);
/// ```
pub fn extract_pagination(params: HashMap<String, String>) -> Result<Pagination, Error> {
    if let (Some(limit), Some(offset)) = (params.get("limit"), params.get("offset")) {
        return Ok(Pagination {
            limit: Some(limit.parse::<u32>().map_err(Error::ParseError)?),
            offset: offset.parse::<u32>().map_err(Error::ParseError)?,
        });
    }

    Err(Error::MissingParameters)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_pagination() {
        let mut params = HashMap::new();
        params.insert(String::from("limit"), String::from("1"));
        params.insert(String::from("offset"), String::from("1"));
        let pagination = extract_pagination(params).unwrap();
        assert_eq!(
            pagination,
            Pagination {
                limit: Some(1),
                offset: 1
            }
        );
    }

    #[test]
    fn missing_offset_parameter() {
        let mut params = HashMap::new();
        params.insert(String::from("limit"), String::from("1"));
        let err = extract_pagination(params).unwrap_err();
        assert_eq!(err.to_string(), Error::MissingParameters.to_string());
    }

    #[test]
    fn wrong_limit_type() {
        let mut params = HashMap::new();
        params.insert(String::from("limit"), String::from("NotANumber"));
        params.insert(String::from("offset"), String::from("1"));
        let err = extract_pagination(params).unwrap_err();
        assert_eq!(err.to_string(), "Cannot parse parameter: invalid digit found in string");
    }
}
