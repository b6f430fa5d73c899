#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    size: u32,
}

impl PageRequest {
    /// Pages are 1-based; anything below 1 is the first page.
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page: page.max(1),
            size,
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.size as usize)
    }
}

pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Vec<T> {
    items
        .into_iter()
        .skip(request.offset())
        .take(request.size() as usize)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{PageRequest, paginate};

    #[test]
    fn page_zero_is_the_first_page() {
        let request = PageRequest::new(0, 10);
        assert_eq!(request.page(), 1);
        assert_eq!(request.offset(), 0);
    }

    #[test]
    fn second_page_matches_the_tail_of_a_larger_first_page() {
        let items: Vec<u32> = (1..=35).collect();

        let wide = paginate(items.clone(), PageRequest::new(1, 20));
        let second = paginate(items, PageRequest::new(2, 10));

        assert_eq!(second, wide[10..20].to_vec());
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let items: Vec<u32> = (1..=5).collect();
        assert!(paginate(items, PageRequest::new(3, 5)).is_empty());
    }

    #[test]
    fn last_page_may_be_short() {
        let items: Vec<u32> = (1..=12).collect();
        assert_eq!(paginate(items, PageRequest::new(2, 10)), vec![11, 12]);
    }
}
